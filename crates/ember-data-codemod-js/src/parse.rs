// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Parsing JavaScript modules with swc.
//!
//! [`ParsedModule`] keeps the AST together with the source it was parsed
//! from, and converts swc's `BytePos` spans into byte offsets of that source
//! so every later stage speaks in [`Span`]s the batch editor understands.

use swc_common::{sync::Lrc, FileName, SourceMap, Spanned, GLOBALS};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};
use thiserror::Error;

use ember_data_codemod_core::patch::Span;
use ember_data_codemod_core::text::byte_offset_to_position;

/// A syntax error reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({line}:{column})")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// A parsed module and the source it came from.
pub struct ParsedModule<'src> {
    pub module: Module,
    source: &'src str,
    base: u32,
}

impl<'src> ParsedModule<'src> {
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Convert an swc span into byte offsets of the source.
    pub fn span(&self, span: swc_common::Span) -> Span {
        let start = span.lo.0.saturating_sub(self.base) as usize;
        let end = span.hi.0.saturating_sub(self.base) as usize;
        Span::new(start.min(self.source.len()), end.min(self.source.len()))
    }

    /// Source span of any spanned node.
    pub fn span_of<N: Spanned>(&self, node: &N) -> Span {
        self.span(node.span())
    }

    /// Source text covered by `span`.
    pub fn text(&self, span: Span) -> &'src str {
        &self.source[span.start..span.end]
    }
}

/// Parse `source` as an ES module.
///
/// JSX is off; decorators (including before `export`) are on, since Ember
/// classes commonly use them. Errors the parser recovered from still fail the
/// parse: a file is only rewritten when it parsed cleanly.
pub fn parse_module<'src>(file: &str, source: &'src str) -> Result<ParsedModule<'src>, ParseError> {
    let cm: Lrc<SourceMap> = Default::default();

    GLOBALS.set(&Default::default(), || {
        let fm = cm.new_source_file(FileName::Custom(file.to_string()), source.to_string());
        let base = fm.start_pos.0;

        let mut syntax = Syntax::Es(Default::default());
        if let Syntax::Es(es) = &mut syntax {
            es.decorators = true;
            es.decorators_before_export = true;
        }

        let lexer = Lexer::new(syntax, EsVersion::EsNext, StringInput::from(&*fm), None);
        let mut parser = Parser::new_from(lexer);

        let parsed = parser.parse_module();
        let recovered = parser.take_errors();
        let to_parse_error = |err: swc_ecma_parser::error::Error| {
            let offset = err.span().lo.0.saturating_sub(base) as usize;
            let (line, column) = byte_offset_to_position(source.as_bytes(), offset);
            ParseError {
                message: err.kind().msg().to_string(),
                line,
                column,
            }
        };

        let module = parsed.map_err(to_parse_error)?;
        if let Some(err) = recovered.into_iter().next() {
            return Err(to_parse_error(err));
        }

        Ok(ParsedModule {
            module,
            source,
            base,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_source_offsets() {
        let source = "import DS from 'ember-data';\nexport default DS.Model;\n";
        let parsed = parse_module("model.js", source).unwrap();
        assert_eq!(parsed.module.body.len(), 2);
        let first = parsed.span_of(&parsed.module.body[0]);
        assert_eq!(parsed.text(first), "import DS from 'ember-data';");
        let second = parsed.span_of(&parsed.module.body[1]);
        assert_eq!(parsed.text(second), "export default DS.Model;");
    }

    #[test]
    fn decorators_parse() {
        let source = "import Model, { attr } from '@ember-data/model';\n\
                      export default class User extends Model {\n  @attr('string') name;\n}\n";
        assert!(parse_module("user.js", source).is_ok());
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = parse_module("broken.js", "const a = ;\n").err().unwrap();
        assert_eq!(err.line, 1);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn multibyte_text_keeps_offsets_aligned() {
        let source = "const s = 'héllo';\nexport default DS.attr;\n";
        let parsed = parse_module("a.js", source).unwrap();
        let second = parsed.span_of(&parsed.module.body[1]);
        assert_eq!(parsed.text(second), "export default DS.attr;");
    }
}
