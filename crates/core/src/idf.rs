//! IDF text codec
//!
//! The IDF format is a flat list of positional records:
//!
//! ```text
//! ! comment to end of line
//! OS:ThermalZone,
//!   Zone 1,                  !- Name
//!   1;                       !- Multiplier
//! ```
//!
//! A record is the type name followed by comma-separated field values and a
//! semicolon terminator. Records may span lines; whitespace around values is
//! insignificant.

use std::fmt::{self, Write as _};

use bemkit_idd::ObjectSchema;

/// Error type for IDF parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdfParseError {
    #[error("line {line}: record has no object type")]
    MissingType { line: usize },

    #[error("line {line}: record starting here is not terminated by ';'")]
    Unterminated { line: usize },
}

/// One parsed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdfRecord {
    pub object_type: String,
    pub fields: Vec<String>,
    /// Line on which the record starts (1-based)
    pub line: usize,
    /// `!` comment lines written above or inside the record, joined by newlines
    pub comment: Option<String>,
    /// Trailing `!` comment of each field value, by field position
    pub field_comments: Vec<Option<String>>,
}

impl IdfRecord {
    pub fn new(object_type: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            object_type: object_type.into(),
            fields,
            line: 0,
            comment: None,
            field_comments: Vec::new(),
        }
    }
}

impl fmt::Display for IdfRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let comments = RecordComments {
            object: self.comment.as_deref(),
            fields: &self.field_comments,
        };
        write_record(&mut out, &self.object_type, &self.fields, None, comments)?;
        f.write_str(&out)
    }
}

/// Text of a user comment, or `None` for blank and generated `!-` comments
fn user_comment(comment: &str) -> Option<&str> {
    if comment.starts_with('-') {
        return None;
    }
    let text = comment.trim();
    (!text.is_empty()).then_some(text)
}

/// Record being read
struct Pending {
    line: usize,
    tokens: Vec<String>,
    comment: Vec<String>,
    /// Comment per token; token 0 is the object type
    token_comments: Vec<Option<String>>,
}

impl Pending {
    fn new(line: usize, comment: Vec<String>) -> Self {
        Self {
            line,
            tokens: Vec::new(),
            comment,
            token_comments: Vec::new(),
        }
    }

    fn annotate(&mut self, token: usize, text: &str) {
        if token == 0 {
            self.comment.push(text.to_string());
            return;
        }
        if self.token_comments.len() <= token {
            self.token_comments.resize(token + 1, None);
        }
        self.token_comments[token] = Some(text.to_string());
    }

    fn finish(mut self) -> Result<IdfRecord, IdfParseError> {
        let object_type = self.tokens.remove(0);
        if object_type.is_empty() {
            return Err(IdfParseError::MissingType { line: self.line });
        }
        let mut field_comments: Vec<Option<String>> = self.token_comments.into_iter().skip(1).collect();
        while field_comments.last().is_some_and(Option::is_none) {
            field_comments.pop();
        }
        Ok(IdfRecord {
            object_type,
            fields: self.tokens,
            line: self.line,
            comment: (!self.comment.is_empty()).then(|| self.comment.join("\n")),
            field_comments,
        })
    }
}

/// Parse IDF text into records
///
/// A comment ending a line annotates the last value terminated on that line.
/// Comment lines outside a record belong to the next record. Generated
/// `!-` field-name comments are dropped.
pub fn parse_records(text: &str) -> Result<Vec<IdfRecord>, IdfParseError> {
    let mut records = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut leading: Vec<String> = Vec::new();
    let mut token = String::new();

    for (line_no, line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let (content, comment) = match line.find('!') {
            Some(pos) => (&line[..pos], user_comment(&line[pos + 1..])),
            None => (line, None),
        };
        // Token terminated last on this line, and the record it closed, if any
        let mut last_token: Option<usize> = None;
        let mut closed: Option<Pending> = None;

        for c in content.chars() {
            match c {
                ',' | ';' => {
                    let record = pending.get_or_insert_with(|| Pending::new(line_no, std::mem::take(&mut leading)));
                    record.tokens.push(token.trim().to_string());
                    token.clear();
                    last_token = Some(record.tokens.len() - 1);

                    if c == ';' {
                        if let Some(done) = closed.take() {
                            records.push(done.finish()?);
                        }
                        closed = pending.take();
                    }
                }
                c => {
                    if pending.is_none() && !c.is_whitespace() {
                        pending = Some(Pending::new(line_no, std::mem::take(&mut leading)));
                        last_token = None;
                    }
                    token.push(c);
                }
            }
        }

        if let Some(text) = comment {
            match (last_token, closed.as_mut(), pending.as_mut()) {
                (Some(token), Some(record), None) => record.annotate(token, text),
                (Some(token), _, Some(record)) => record.annotate(token, text),
                (None, _, Some(record)) => record.comment.push(text.to_string()),
                (None, _, None) => leading.push(text.to_string()),
                // The comment follows a closed record and a new one has not begun
                (Some(_), None, None) => leading.push(text.to_string()),
            }
        }
        if let Some(done) = closed {
            records.push(done.finish()?);
        }
        // A line break separates words like any other whitespace
        if pending.is_some() {
            token.push(' ');
        }
    }

    match pending {
        Some(record) => Err(IdfParseError::Unterminated { line: record.line }),
        None => Ok(records),
    }
}

/// User comments written with a record
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RecordComments<'a> {
    pub object: Option<&'a str>,
    pub fields: &'a [Option<String>],
}

/// Append one record in IDF layout
///
/// Each value carries its user comment, or else its field name when a schema
/// is given. The object comment is written above the record.
pub(crate) fn write_record(
    out: &mut String,
    object_type: &str,
    fields: &[String],
    schema: Option<&ObjectSchema>,
    comments: RecordComments<'_>,
) -> fmt::Result {
    if let Some(comment) = comments.object {
        for line in comment.lines() {
            writeln!(out, "! {}", line)?;
        }
    }
    if fields.is_empty() {
        return writeln!(out, "{};", object_type);
    }
    writeln!(out, "{},", object_type)?;

    let last = fields.len() - 1;
    for (i, value) in fields.iter().enumerate() {
        let terminator = if i == last { ';' } else { ',' };
        let cell = format!("{}{}", value, terminator);
        if let Some(Some(comment)) = comments.fields.get(i) {
            writeln!(out, "  {:<25}! {}", cell, comment)?;
            continue;
        }
        let name = schema.and_then(|s| s.field(i)).map(|f| {
            match group_of(schema, i) {
                Some(group) => format!("{} {}", f.name, group + 1),
                None => f.name.clone(),
            }
        });
        match name {
            Some(name) => writeln!(out, "  {:<25}!- {}", cell, name)?,
            None => writeln!(out, "  {}", cell)?,
        }
    }
    Ok(())
}

fn group_of(schema: Option<&ObjectSchema>, index: usize) -> Option<usize> {
    schema
        .and_then(|s| s.extensible_position(index))
        .map(|(group, _)| group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bemkit_idd::FieldSchema;

    #[test]
    fn test_parse_records() {
        let text = "\
! header comment
OS:ThermalZone,
  Zone 1,      !- Name
  2;           !- Multiplier

OS:Building, Main;
OS:Version;
";
        let records = parse_records(text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].object_type, "OS:ThermalZone");
        assert_eq!(records[0].fields, vec!["Zone 1", "2"]);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[1].fields, vec!["Main"]);
        assert_eq!(records[1].line, 6);
        assert!(records[2].fields.is_empty());
    }

    #[test]
    fn test_blank_fields_are_kept() {
        let records = parse_records("OS:Curve, A, , 3, ;").unwrap();
        assert_eq!(records[0].fields, vec!["A", "", "3", ""]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_records("OS:ThermalZone,\n  Zone 1\n"),
            Err(IdfParseError::Unterminated { line: 1 })
        );
        assert_eq!(
            parse_records("\n , Zone 1;"),
            Err(IdfParseError::MissingType { line: 2 })
        );
    }

    #[test]
    fn test_record_display_round_trip() {
        let record = IdfRecord::new("OS:ThermalZone", vec!["Zone 1".into(), "".into()]);
        let text = record.to_string();
        assert_eq!(text, "OS:ThermalZone,\n  Zone 1,\n  ;\n");

        let parsed = parse_records(&text).unwrap();
        assert_eq!(parsed[0].fields, record.fields);
    }

    #[test]
    fn test_write_record_with_comments() {
        let schema = ObjectSchema::builder("OS:Table")
            .field(FieldSchema::name_field())
            .extensible(FieldSchema::number("X"))
            .build();
        let mut out = String::new();
        write_record(
            &mut out,
            "OS:Table",
            &["T".to_string(), "1".to_string(), "2".to_string()],
            Some(&schema),
            RecordComments::default(),
        )
        .unwrap();
        assert!(out.contains("!- Name"));
        assert!(out.contains("!- X 1"));
        assert!(out.contains("!- X 2"));
        assert!(out.trim_end().ends_with("!- X 2"));
    }

    #[test]
    fn test_user_comments_are_kept() {
        let text = "\
! Zones of the ground floor
OS:ThermalZone,
  Zone 1,                  !- Name
  2,                       ! doubled for the east wing
  ;                        !- Ceiling Height
";
        let records = parse_records(text).unwrap();
        let zone = &records[0];
        assert_eq!(zone.comment.as_deref(), Some("Zones of the ground floor"));
        assert_eq!(zone.field_comments, vec![None, Some("doubled for the east wing".to_string())]);

        let written = zone.to_string();
        assert!(written.starts_with("! Zones of the ground floor\nOS:ThermalZone,\n"));
        assert!(written.contains("  2,                       ! doubled for the east wing\n"));

        let reparsed = parse_records(&written).unwrap();
        assert_eq!(reparsed[0].comment, zone.comment);
        assert_eq!(reparsed[0].field_comments, zone.field_comments);
        assert_eq!(reparsed[0].fields, zone.fields);
    }

    #[test]
    fn test_comments_attach_to_the_right_record() {
        let text = "OS:A, x; ! about a\n! about b\nOS:B, ! also b\n  y; ! last of b\n";
        let records = parse_records(text).unwrap();
        assert_eq!(records[0].comment, None);
        assert_eq!(records[0].field_comments, vec![Some("about a".to_string())]);
        assert_eq!(records[1].comment.as_deref(), Some("about b\nalso b"));
        assert_eq!(records[1].field_comments, vec![Some("last of b".to_string())]);
    }

    #[test]
    fn test_user_comment_replaces_field_name() {
        let schema = ObjectSchema::builder("OS:Table")
            .field(FieldSchema::name_field())
            .field(FieldSchema::number("X"))
            .build();
        let field_comments = vec![None, Some("measured".to_string())];
        let mut out = String::new();
        write_record(
            &mut out,
            "OS:Table",
            &["T".to_string(), "1".to_string()],
            Some(&schema),
            RecordComments {
                object: Some("first\nsecond"),
                fields: &field_comments,
            },
        )
        .unwrap();
        assert_eq!(
            out,
            "! first\n! second\nOS:Table,\n  T,                       !- Name\n  1;                       ! measured\n"
        );
    }
}
