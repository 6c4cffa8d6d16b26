use petal_parser::ast::*;
use std::collections::HashSet;

/// Visitor pattern for traversing expression and markup trees immutably
///
/// This trait provides default implementations that walk the entire tree.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_markup_node(&mut self, node: &MarkupNode) {
        walk_markup_node(self, node);
    }

    fn visit_attribute(&mut self, _attribute: &MarkupAttribute) {
        // Attribute values are raw text, callers decide which ones to parse
    }

    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    /// Called for every arrow function before its body is walked
    fn visit_arrow(&mut self, _params: &[String], body: &ArrowBody) {
        walk_arrow_body(self, body);
    }
}

pub fn walk_markup_node<V: Visitor>(visitor: &mut V, node: &MarkupNode) {
    match node {
        MarkupNode::Element {
            attributes,
            children,
            ..
        } => {
            for attribute in attributes {
                visitor.visit_attribute(attribute);
            }
            for child in children {
                visitor.visit_markup_node(child);
            }
        }
        MarkupNode::Text { .. } | MarkupNode::Comment { .. } => {
            // Leaf nodes
        }
    }
}

pub fn walk_program<V: Visitor>(visitor: &mut V, program: &Program) {
    for statement in &program.statements {
        visitor.visit_expression(statement);
    }
}

pub fn walk_arrow_body<V: Visitor>(visitor: &mut V, body: &ArrowBody) {
    match body {
        ArrowBody::Expression(expr) => visitor.visit_expression(expr),
        ArrowBody::Block(program) => visitor.visit_program(program),
    }
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &Expression) {
    match expr {
        Expression::Number { .. }
        | Expression::String { .. }
        | Expression::Boolean { .. }
        | Expression::Null { .. }
        | Expression::Undefined { .. }
        | Expression::Identifier { .. } => {
            // Leaf nodes
        }
        Expression::Template { parts, .. } => {
            for part in parts {
                if let TemplatePart::Expression(expr) = part {
                    visitor.visit_expression(expr);
                }
            }
        }
        Expression::Array { elements, .. } => {
            for element in elements {
                visitor.visit_expression(element);
            }
        }
        Expression::Object { properties, .. } => {
            for property in properties {
                visitor.visit_expression(&property.value);
            }
        }
        Expression::Member { object, .. } => {
            visitor.visit_expression(object);
        }
        Expression::Index { object, index, .. } => {
            visitor.visit_expression(object);
            visitor.visit_expression(index);
        }
        Expression::Call {
            callee, arguments, ..
        } => {
            visitor.visit_expression(callee);
            for arg in arguments {
                visitor.visit_expression(arg);
            }
        }
        Expression::Unary { operand, .. } => {
            visitor.visit_expression(operand);
        }
        Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
            visitor.visit_expression(left);
            visitor.visit_expression(right);
        }
        Expression::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => {
            visitor.visit_expression(test);
            visitor.visit_expression(consequent);
            visitor.visit_expression(alternate);
        }
        Expression::Assign { target, value, .. } => {
            visitor.visit_expression(target);
            visitor.visit_expression(value);
        }
        Expression::Update { target, .. } => {
            visitor.visit_expression(target);
        }
        Expression::Arrow { params, body, .. } => {
            visitor.visit_arrow(params, body);
        }
    }
}

/// Collects the identifiers an expression reads from its scope chain,
/// excluding arrow parameters bound inside the expression itself
#[derive(Debug, Default)]
pub struct FreeIdentifiers {
    bound: Vec<HashSet<String>>,
    seen: HashSet<String>,
    pub names: Vec<String>,
}

impl FreeIdentifiers {
    pub fn of_expression(expr: &Expression) -> Vec<String> {
        let mut collector = Self::default();
        collector.visit_expression(expr);
        collector.names
    }

    pub fn of_program(program: &Program) -> Vec<String> {
        let mut collector = Self::default();
        collector.visit_program(program);
        collector.names
    }

    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|frame| frame.contains(name))
    }
}

impl Visitor for FreeIdentifiers {
    fn visit_expression(&mut self, expr: &Expression) {
        if let Expression::Identifier { name, .. } = expr {
            if !self.is_bound(name) && self.seen.insert(name.clone()) {
                self.names.push(name.clone());
            }
            return;
        }
        walk_expression(self, expr);
    }

    fn visit_arrow(&mut self, params: &[String], body: &ArrowBody) {
        self.bound.push(params.iter().cloned().collect());
        walk_arrow_body(self, body);
        self.bound.pop();
    }
}
