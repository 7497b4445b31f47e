//! Instruction prompts sent with every page image.
//!
//! One prompt per [`ExtractionMode`]. Both demand a bare JSON object in a
//! fixed shape; the notes prompt additionally spells out string escaping,
//! because letters and notes are where models most often emit raw line
//! breaks and quotes inside JSON strings.
//!
//! Callers can override via [`crate::config::ExtractionConfig::prompt`].

use crate::config::ExtractionMode;

/// Prompt for the table extraction mode.
pub const TABULAR_PROMPT: &str = r#"You are an expert OCR system specialized in extracting data from documents, mark sheets, result sheets, invoices, tables, and any structured data.

Analyze this image and extract ALL information you can find. Return the data as a valid JSON object with this structure:

{
  "metadata": {
    "field_name": "value"
  },
  "tableHeaders": ["Column1", "Column2", "Column3"],
  "tableData": [
    {"Column1": "value1", "Column2": "value2", "Column3": "value3"}
  ],
  "summary": {
    "field_name": "value"
  },
  "remarks": {
    "field_name": "value"
  }
}

IMPORTANT:
- "metadata" should contain any header information like student name, ID, class, school name, date, term, etc.
- "tableHeaders" should be an array of ALL column headers exactly as they appear in the document
- "tableData" should be an array of objects where each object represents a row, with keys matching the tableHeaders
- "summary" should contain any totals, averages, percentages, positions, or aggregate data
- "remarks" should contain any comments, notes, or remarks sections
- Extract EXACTLY what you see - do not assume or add columns that don't exist
- Preserve the original column names from the document
- If a field is not visible/present, omit it from the response
- Handle handwritten text carefully
- Return ONLY valid JSON, no additional text or markdown"#;

/// Prompt for the notes/letters extraction mode.
pub const NOTES_PROMPT: &str = r#"You are an expert OCR system. Extract ALL text from this image EXACTLY as it appears on the paper.

CRITICAL: Return ONLY a valid JSON object with PROPERLY ESCAPED strings.

Return the extracted text in this EXACT JSON format:
{
  "title": "Document title if visible (optional)",
  "content": "The full extracted text content with PRESERVED formatting",
  "type": "letter/memo/note/other",
  "date": "Date if visible (optional)",
  "from": "Sender if visible (optional)",
  "to": "Recipient if visible (optional)"
}

CRITICAL FORMATTING RULES:
- Preserve ALL original line breaks by using \n (escaped newline) in the JSON
- Maintain original spacing and indentation (use spaces to replicate indentation)
- Keep blank lines/paragraph breaks using \n\n (double newline)
- Preserve bullet points, numbers, or list formatting using the original characters
- Maintain text alignment patterns using appropriate spacing
- Preserve any special characters, dashes, underscores, or symbols
- DO NOT reformat, reorganize, or "clean up" the text
- Extract text EXACTLY as a human would read it from top to bottom, left to right

CRITICAL JSON ESCAPING RULES:
- Use \n for newlines (NOT actual line breaks in the JSON string)
- Use \" for quotes within text
- Use \\ for backslashes
- Ensure all strings are properly escaped for valid JSON
- Example: "content": "Line 1\nLine 2\n\nParagraph 2"

CRITICAL OUTPUT RULES:
- Return ONLY the JSON object
- NO explanatory text before or after the JSON
- NO markdown code blocks
- Start your response with { and end with }
- Ensure the JSON is valid and parseable"#;

/// Built-in prompt for `mode`.
pub fn prompt_for(mode: ExtractionMode) -> &'static str {
    match mode {
        ExtractionMode::Tabular => TABULAR_PROMPT,
        ExtractionMode::Notes => NOTES_PROMPT,
    }
}
