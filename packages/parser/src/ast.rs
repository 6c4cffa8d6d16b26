use serde::{Deserialize, Serialize};

/// Span information for source location tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A `;`-separated list of expression statements (event handler bodies,
/// `v-effect`, arrow function blocks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Expression>,
}

/// Expression (used in directive values and interpolation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    /// Number literal
    Number { value: f64, span: Span },

    /// String literal
    String { value: String, span: Span },

    /// Boolean literal
    Boolean { value: bool, span: Span },

    Null { span: Span },

    Undefined { span: Span },

    /// Variable reference, resolved through the scope chain
    Identifier { name: String, span: Span },

    /// Template literal with `${...}` interpolation
    Template { parts: Vec<TemplatePart>, span: Span },

    /// Array literal
    Array { elements: Vec<Expression>, span: Span },

    /// Object literal
    Object {
        properties: Vec<ObjectProperty>,
        span: Span,
    },

    /// Member access (obj.prop, obj?.prop)
    Member {
        object: Box<Expression>,
        property: String,
        optional: bool,
        span: Span,
    },

    /// Computed member access (obj[key])
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },

    /// Function or method call
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        span: Span,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },

    /// Binary operation (a + b)
    Binary {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
        span: Span,
    },

    /// Short-circuiting operation (a && b, a || b, a ?? b)
    Logical {
        left: Box<Expression>,
        operator: LogicalOp,
        right: Box<Expression>,
        span: Span,
    },

    /// Ternary (test ? consequent : alternate)
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
        span: Span,
    },

    /// Assignment to an identifier or member (a = b, a.b += c)
    Assign {
        target: Box<Expression>,
        operator: AssignOp,
        value: Box<Expression>,
        span: Span,
    },

    /// Increment / decrement (a++, --a)
    Update {
        target: Box<Expression>,
        operator: UpdateOp,
        prefix: bool,
        span: Span,
    },

    /// Arrow function
    Arrow {
        params: Vec<String>,
        body: ArrowBody,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Number { span, .. }
            | Expression::String { span, .. }
            | Expression::Boolean { span, .. }
            | Expression::Null { span }
            | Expression::Undefined { span }
            | Expression::Identifier { span, .. }
            | Expression::Template { span, .. }
            | Expression::Array { span, .. }
            | Expression::Object { span, .. }
            | Expression::Member { span, .. }
            | Expression::Index { span, .. }
            | Expression::Call { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Logical { span, .. }
            | Expression::Conditional { span, .. }
            | Expression::Assign { span, .. }
            | Expression::Update { span, .. }
            | Expression::Arrow { span, .. } => *span,
        }
    }

    /// True for the shapes that may appear on the left of `=`
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expression::Identifier { .. } | Expression::Member { .. } | Expression::Index { .. }
        )
    }

    /// True for a dotted/indexed path such as `save` or `todo.remove`.
    /// Event handlers written as a bare path are invoked with the event.
    pub fn is_simple_path(&self) -> bool {
        match self {
            Expression::Identifier { .. } => true,
            Expression::Member {
                object, optional, ..
            } => !optional && object.is_simple_path(),
            Expression::Index { object, index, .. } => {
                object.is_simple_path()
                    && matches!(
                        index.as_ref(),
                        Expression::Number { .. }
                            | Expression::String { .. }
                            | Expression::Identifier { .. }
                    )
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(Program),
}

/// Template string parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    Literal(String),
    Expression(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    Typeof,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equals,
    NotEquals,
    StrictEquals,
    StrictNotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// Left-hand side of a `v-for` header: one binding per item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BindingPattern {
    Identifier { name: String },
    /// `[a, , b]` - holes are `None`
    Array { elements: Vec<Option<BindingPattern>> },
    /// `{ id, label: title }`
    Object { fields: Vec<ObjectPatternField> },
}

impl BindingPattern {
    /// Every name this pattern introduces, in source order
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            BindingPattern::Identifier { name } => names.push(name.clone()),
            BindingPattern::Array { elements } => {
                for element in elements.iter().flatten() {
                    element.collect_names(names);
                }
            }
            BindingPattern::Object { fields } => {
                for field in fields {
                    field.binding.collect_names(names);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatternField {
    pub key: String,
    pub binding: BindingPattern,
}

/// Parsed `v-for` header: `pattern in source`, `(value, index) of source`,
/// `(value, key, index) in object`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForHeader {
    pub value: BindingPattern,
    pub index: Option<String>,
    pub object_index: Option<String>,
    pub source: Expression,
    pub source_text: String,
}

/// Parsed markup document (HTML subset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupDocument {
    pub nodes: Vec<MarkupNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarkupNode {
    Element {
        tag: String,
        attributes: Vec<MarkupAttribute>,
        children: Vec<MarkupNode>,
        span: Span,
    },
    Text { content: String, span: Span },
    Comment { content: String, span: Span },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupAttribute {
    pub name: String,
    pub value: String,
    /// Location of the value inside the markup source
    pub value_span: Span,
}
