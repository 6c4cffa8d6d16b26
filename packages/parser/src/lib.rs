pub mod ast;
pub mod error;
pub mod markup;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{
    ArrowBody, AssignOp, BinaryOp, BindingPattern, Expression, ForHeader, LogicalOp,
    MarkupAttribute, MarkupDocument, MarkupNode, ObjectPatternField, ObjectProperty, Program,
    Span, TemplatePart, UnaryOp, UpdateOp,
};
#[cfg(feature = "pretty-errors")]
pub use error::format_errors;
pub use error::{ParseError, ParseResult};
pub use markup::{decode_entities, is_void_element, parse_markup};
pub use parser::{parse_expression, parse_for_header, parse_statements, unescape, Parser};
pub use serializer::{
    escape_attribute, escape_text, is_raw_text_element, serialize, write_open_tag, Serializer,
};
pub use tokenizer::{tokenize, Token};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_basic() {
        let tokens = tokenize("count + 1").unwrap();
        assert_eq!(tokens.len(), 3);
    }
}
