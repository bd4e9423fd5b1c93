//! Pipeline stages for turning a lab-report PDF into a spreadsheet.
//!
//! Each submodule implements one step and can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ normalise ──▶ grammar/extract ──▶ render
//! (archive)  (pdfium)  (cleanup)     (records)          (xlsx)
//! ```
//!
//! 1. [`input`]     validate the PDF and archive it in the reports directory
//! 2. [`text`]      read the text layer of the selected pages
//! 3. [`normalise`] line endings and invisible characters
//! 4. [`grammar`]   the line rules that locate result lines
//! 5. [`extract`]   parse numbers, attach prior values, classify
//! 6. [`render`]    write the colour-coded workbook

pub mod extract;
pub mod grammar;
pub mod input;
pub mod normalise;
pub mod render;
pub mod text;
