// SPDX-License-Identifier: MIT

//! Instruction templates with `{field}` placeholders
//!
//! Only the keys of [`StateField`] are placeholders; any other braced text
//! (JSON examples, literal braces) is left as written.

use crate::adk::state::{StateField, StateView};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(StateField),
}

/// A parsed instruction template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let field = after
                .find('}')
                .and_then(|close| StateField::from_key(&after[..close]).map(|f| (f, close)));

            match field {
                Some((field, close)) => {
                    literal.push_str(&rest[..open]);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                    rest = &after[close + 1..];
                }
                None => {
                    literal.push_str(&rest[..=open]);
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Fields referenced by placeholders, in order of first use
    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(f) = segment {
                if !fields.contains(f) {
                    fields.push(*f);
                }
            }
        }
        fields
    }

    /// First placeholder that is not in `reads`
    pub fn undeclared(&self, reads: &[StateField]) -> Option<StateField> {
        self.fields().into_iter().find(|f| !reads.contains(f))
    }

    /// Substitute placeholders from the view
    pub fn render(&self, view: &StateView) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => out.push_str(view.get(*field).unwrap_or_default()),
            }
        }
        out
    }
}
