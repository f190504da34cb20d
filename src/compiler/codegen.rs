//! Lowering from the AST to a bytecode [`Program`].
//!
//! Name resolution happens here: locals and fields become slot indices,
//! sibling-method calls become function indices. Errors are accumulated so
//! one pass can report every unresolved name in the unit.

use crate::compiler::bytecode::{
    Constant, FieldDef, FunctionDef, INIT_FUNCTION, Instruction, Program,
};
use crate::core::value::TypeTag;
use crate::lexer::Span;
use crate::parser::ast::{BinOp, ClassDecl, Expr, MethodDecl, Stmt, UnaryOp};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// An error found while lowering a unit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Unknown identifier '{name}'")]
    UnknownIdentifier { name: String, span: Span },

    #[error("Unknown method '{name}'")]
    UnknownMethod { name: String, span: Span },

    #[error("No overload of '{name}' takes {argc} argument(s)")]
    WrongArgCount {
        name: String,
        argc: usize,
        span: Span,
    },

    #[error("Ambiguous call to '{name}' with {argc} argument(s)")]
    AmbiguousCall {
        name: String,
        argc: usize,
        span: Span,
    },

    #[error("Duplicate method '{name}' with identical parameter types")]
    DuplicateMethod { name: String, span: Span },

    #[error("Duplicate field '{name}'")]
    DuplicateField { name: String, span: Span },

    #[error("Cannot assign to '{name}': no such local or field")]
    UnknownAssignTarget { name: String, span: Span },

    #[error("'print' takes exactly one argument")]
    PrintArity { span: Span },

    #[error("Unit exceeds the {what} limit")]
    LimitExceeded { what: &'static str, span: Span },
}

impl CodegenError {
    pub fn span(&self) -> &Span {
        match self {
            CodegenError::UnknownIdentifier { span, .. }
            | CodegenError::UnknownMethod { span, .. }
            | CodegenError::WrongArgCount { span, .. }
            | CodegenError::AmbiguousCall { span, .. }
            | CodegenError::DuplicateMethod { span, .. }
            | CodegenError::DuplicateField { span, .. }
            | CodegenError::UnknownAssignTarget { span, .. }
            | CodegenError::PrintArity { span }
            | CodegenError::LimitExceeded { span, .. } => span,
        }
    }
}

/// Lower a parsed class into a program named after the unit.
pub fn generate(class: &ClassDecl, unit_name: &str) -> Result<Program, Vec<CodegenError>> {
    let mut codegen = CodeGen::new(class, unit_name);
    codegen.run();
    if codegen.errors.is_empty() {
        Ok(codegen.program)
    } else {
        Err(codegen.errors)
    }
}

struct CodeGen<'ast> {
    class: &'ast ClassDecl,
    program: Program,
    errors: Vec<CodegenError>,

    /// Field name to slot index.
    field_slots: FxHashMap<String, u16>,
    /// Method (name, arity) in declaration order, for sibling-call
    /// resolution before bodies are emitted.
    signatures: Vec<(String, usize)>,

    // Per-function state
    locals: FxHashMap<String, u16>,
    local_count: u16,
    code: Vec<Instruction>,
}

impl<'ast> CodeGen<'ast> {
    fn new(class: &'ast ClassDecl, unit_name: &str) -> Self {
        Self {
            class,
            program: Program::new(unit_name.to_string()),
            errors: Vec::new(),
            field_slots: FxHashMap::default(),
            signatures: Vec::new(),
            locals: FxHashMap::default(),
            local_count: 0,
            code: Vec::new(),
        }
    }

    fn run(&mut self) {
        let class = self.class;
        self.collect_fields();
        self.collect_signatures();

        for method in &class.methods {
            let function = self.gen_method(method);
            self.program.functions.push(function);
        }

        if let Some(init) = self.gen_init() {
            self.program.functions.push(init);
        }
    }

    fn collect_fields(&mut self) {
        let class = self.class;
        for field in &class.fields {
            if self.field_slots.contains_key(&field.name) {
                self.errors.push(CodegenError::DuplicateField {
                    name: field.name.clone(),
                    span: field.span,
                });
                continue;
            }
            let slot = self.field_slots.len() as u16;
            self.field_slots.insert(field.name.clone(), slot);
            self.program.fields.push(FieldDef {
                name: field.name.clone(),
                ty: field.ty,
            });
        }
    }

    fn collect_signatures(&mut self) {
        let class = self.class;
        let mut seen: Vec<(&str, Vec<TypeTag>)> = Vec::new();
        for method in &class.methods {
            let tags: Vec<TypeTag> = method.params.iter().map(|p| p.ty).collect();
            if seen.iter().any(|(n, t)| *n == method.name && *t == tags) {
                self.errors.push(CodegenError::DuplicateMethod {
                    name: method.name.clone(),
                    span: method.span,
                });
            }
            seen.push((&method.name, tags));
            self.signatures
                .push((method.name.clone(), method.params.len()));
        }
    }

    // =========================================
    // Functions
    // =========================================

    fn gen_method(&mut self, method: &MethodDecl) -> FunctionDef {
        self.locals.clear();
        self.local_count = 0;
        self.code = Vec::new();

        for param in &method.params {
            self.declare_local(&param.name, &method.span);
        }

        for stmt in &method.body {
            self.gen_stmt(stmt);
        }

        // Falling off the end returns unit.
        if !matches!(
            self.code.last(),
            Some(Instruction::Return | Instruction::ReturnValue)
        ) {
            self.emit(Instruction::Return);
        }

        if self.code.len() > u16::MAX as usize {
            self.errors.push(CodegenError::LimitExceeded {
                what: "instructions per method",
                span: method.span,
            });
        }

        FunctionDef {
            name: method.name.clone(),
            params: method.params.iter().map(|p| p.ty).collect(),
            return_ty: method.return_ty,
            local_count: self.local_count,
            code: std::mem::take(&mut self.code),
        }
    }

    /// Synthesize the field-initializer function, when any field has an
    /// initializer expression.
    fn gen_init(&mut self) -> Option<FunctionDef> {
        let class = self.class;
        if class.fields.iter().all(|f| f.init.is_none()) {
            return None;
        }

        self.locals.clear();
        self.local_count = 0;
        self.code = Vec::new();

        for field in &class.fields {
            let Some(init) = &field.init else { continue };
            let Some(&slot) = self.field_slots.get(&field.name) else {
                continue; // duplicate field, already reported
            };
            self.gen_expr(init);
            self.emit(Instruction::StoreField(slot));
        }
        self.emit(Instruction::Return);

        Some(FunctionDef {
            name: INIT_FUNCTION.to_string(),
            params: Vec::new(),
            return_ty: TypeTag::Void,
            local_count: 0,
            code: std::mem::take(&mut self.code),
        })
    }

    // =========================================
    // Statements
    // =========================================

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, span } => {
                self.gen_expr(init);
                let slot = self.declare_local(name, span);
                self.emit(Instruction::StoreLocal(slot));
            }
            Stmt::Assign { name, value, span } => {
                self.gen_expr(value);
                if let Some(&slot) = self.locals.get(name) {
                    self.emit(Instruction::StoreLocal(slot));
                } else if let Some(&slot) = self.field_slots.get(name) {
                    self.emit(Instruction::StoreField(slot));
                } else {
                    self.errors.push(CodegenError::UnknownAssignTarget {
                        name: name.clone(),
                        span: *span,
                    });
                    self.emit(Instruction::Pop);
                }
            }
            Stmt::Return { value, .. } => match value {
                Some(expr) => {
                    self.gen_expr(expr);
                    self.emit(Instruction::ReturnValue);
                }
                None => {
                    self.emit(Instruction::Return);
                }
            },
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                self.gen_expr(cond);
                let to_else = self.emit(Instruction::JumpIfFalse(0));
                for s in then_body {
                    self.gen_stmt(s);
                }
                match else_body {
                    Some(else_body) => {
                        let to_end = self.emit(Instruction::Jump(0));
                        self.patch_to_here(to_else);
                        for s in else_body {
                            self.gen_stmt(s);
                        }
                        self.patch_to_here(to_end);
                    }
                    None => {
                        self.patch_to_here(to_else);
                    }
                }
            }
            Stmt::While { cond, body, .. } => {
                let loop_start = self.code.len();
                self.gen_expr(cond);
                let to_end = self.emit(Instruction::JumpIfFalse(0));
                for s in body {
                    self.gen_stmt(s);
                }
                self.emit(Instruction::Jump(loop_start as u16));
                self.patch_to_here(to_end);
            }
            Stmt::Expr { expr, .. } => {
                self.gen_expr(expr);
                self.emit(Instruction::Pop);
            }
        }
    }

    // =========================================
    // Expressions
    // =========================================

    fn gen_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntLit(v, span) => {
                let idx = self.add_constant(Constant::Int(*v), span);
                self.emit(Instruction::PushConst(idx));
            }
            Expr::FloatLit(v, span) => {
                let idx = self.add_constant(Constant::Float(*v), span);
                self.emit(Instruction::PushConst(idx));
            }
            Expr::StrLit(s, span) => {
                let idx = self.add_constant(Constant::Str(s.clone()), span);
                self.emit(Instruction::PushConst(idx));
            }
            Expr::BoolLit(v, span) => {
                let idx = self.add_constant(Constant::Bool(*v), span);
                self.emit(Instruction::PushConst(idx));
            }
            Expr::Ident(name, span) => {
                if let Some(&slot) = self.locals.get(name) {
                    self.emit(Instruction::LoadLocal(slot));
                } else if let Some(&slot) = self.field_slots.get(name) {
                    self.emit(Instruction::LoadField(slot));
                } else {
                    self.errors.push(CodegenError::UnknownIdentifier {
                        name: name.clone(),
                        span: *span,
                    });
                    self.emit(Instruction::PushUnit);
                }
            }
            Expr::Unary { op, operand, .. } => {
                self.gen_expr(operand);
                match op {
                    UnaryOp::Neg => self.emit(Instruction::Neg),
                    UnaryOp::Not => self.emit(Instruction::Not),
                };
            }
            Expr::Binary {
                op: BinOp::And,
                lhs,
                rhs,
                span,
            } => {
                // Short-circuit: false && _ is false without evaluating rhs.
                self.gen_expr(lhs);
                let to_false = self.emit(Instruction::JumpIfFalse(0));
                self.gen_expr(rhs);
                let to_end = self.emit(Instruction::Jump(0));
                self.patch_to_here(to_false);
                let idx = self.add_constant(Constant::Bool(false), span);
                self.emit(Instruction::PushConst(idx));
                self.patch_to_here(to_end);
            }
            Expr::Binary {
                op: BinOp::Or,
                lhs,
                rhs,
                span,
            } => {
                self.gen_expr(lhs);
                let to_rhs = self.emit(Instruction::JumpIfFalse(0));
                let idx = self.add_constant(Constant::Bool(true), span);
                self.emit(Instruction::PushConst(idx));
                let to_end = self.emit(Instruction::Jump(0));
                self.patch_to_here(to_rhs);
                self.gen_expr(rhs);
                self.patch_to_here(to_end);
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                self.gen_expr(lhs);
                self.gen_expr(rhs);
                let instruction = match op {
                    BinOp::Add => Instruction::Add,
                    BinOp::Sub => Instruction::Sub,
                    BinOp::Mul => Instruction::Mul,
                    BinOp::Div => Instruction::Div,
                    BinOp::Mod => Instruction::Mod,
                    BinOp::Eq => Instruction::Eq,
                    BinOp::Ne => Instruction::Ne,
                    BinOp::Lt => Instruction::Lt,
                    BinOp::Le => Instruction::Le,
                    BinOp::Gt => Instruction::Gt,
                    BinOp::Ge => Instruction::Ge,
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                };
                self.emit(instruction);
            }
            Expr::Index { base, index, .. } => {
                self.gen_expr(base);
                self.gen_expr(index);
                self.emit(Instruction::Index);
            }
            Expr::Call { name, args, span } => self.gen_call(name, args, span),
        }
    }

    fn gen_call(&mut self, name: &str, args: &[Expr], span: &Span) {
        if name == "print" {
            if args.len() != 1 {
                self.errors.push(CodegenError::PrintArity { span: *span });
                self.emit(Instruction::PushUnit);
                return;
            }
            self.gen_expr(&args[0]);
            self.emit(Instruction::Print);
            return;
        }

        let matching_name = self.signatures.iter().filter(|(n, _)| n == name).count();
        if matching_name == 0 {
            self.errors.push(CodegenError::UnknownMethod {
                name: name.to_string(),
                span: *span,
            });
            self.emit(Instruction::PushUnit);
            return;
        }

        let candidates: Vec<usize> = self
            .signatures
            .iter()
            .enumerate()
            .filter(|(_, (n, argc))| n == name && *argc == args.len())
            .map(|(idx, _)| idx)
            .collect();

        let target = match candidates.as_slice() {
            [] => {
                self.errors.push(CodegenError::WrongArgCount {
                    name: name.to_string(),
                    argc: args.len(),
                    span: *span,
                });
                self.emit(Instruction::PushUnit);
                return;
            }
            [one] => *one,
            _ => {
                self.errors.push(CodegenError::AmbiguousCall {
                    name: name.to_string(),
                    argc: args.len(),
                    span: *span,
                });
                self.emit(Instruction::PushUnit);
                return;
            }
        };

        for arg in args {
            self.gen_expr(arg);
        }
        self.emit(Instruction::Call(target as u16));
    }

    // =========================================
    // Helpers
    // =========================================

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.code.push(instruction);
        self.code.len() - 1
    }

    /// Point the placeholder jump at `at` to the next emitted instruction.
    fn patch_to_here(&mut self, at: usize) {
        let target = self.code.len() as u16;
        match &mut self.code[at] {
            Instruction::Jump(n) | Instruction::JumpIfFalse(n) => *n = target,
            other => unreachable!("patching a non-jump instruction {other:?}"),
        }
    }

    fn declare_local(&mut self, name: &str, span: &Span) -> u16 {
        if self.local_count == u16::MAX {
            self.errors.push(CodegenError::LimitExceeded {
                what: "locals per method",
                span: *span,
            });
            return 0;
        }
        let slot = self.local_count;
        self.local_count += 1;
        self.locals.insert(name.to_string(), slot);
        slot
    }

    fn add_constant(&mut self, constant: Constant, span: &Span) -> u16 {
        if let Some(idx) = self.program.constants.iter().position(|c| *c == constant) {
            return idx as u16;
        }
        if self.program.constants.len() >= u16::MAX as usize {
            self.errors.push(CodegenError::LimitExceeded {
                what: "constant pool",
                span: *span,
            });
            return 0;
        }
        self.program.constants.push(constant);
        (self.program.constants.len() - 1) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_unit;

    fn lower(source: &str) -> Result<Program, Vec<CodegenError>> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty());
        let class = parse_unit(tokens).expect("parse");
        generate(&class, &class.name.clone())
    }

    #[test]
    fn methods_keep_declaration_order() {
        let program = lower("class A { int f() { return 1; } int g() { return 2; } }").unwrap();
        let names: Vec<&str> = program.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["f", "g"]);
    }

    #[test]
    fn field_initializers_produce_init_function() {
        let program = lower("class A { int x = 3; void f() { } }").unwrap();
        assert!(program.init_function().is_some());
        let init = &program.functions[program.init_function().unwrap()];
        assert!(init.code.contains(&Instruction::StoreField(0)));
    }

    #[test]
    fn unknown_identifier_is_reported() {
        let errs = lower("class A { int f() { return nope; } }").unwrap_err();
        assert!(matches!(
            errs[0],
            CodegenError::UnknownIdentifier { .. }
        ));
    }

    #[test]
    fn sibling_call_resolves_forward() {
        let program =
            lower("class A { int f() { return g(); } int g() { return 7; } }").unwrap();
        assert!(program.functions[0].code.contains(&Instruction::Call(1)));
    }

    #[test]
    fn duplicate_signature_is_reported() {
        let errs =
            lower("class A { int f(int a) { return a; } int f(int b) { return b; } }").unwrap_err();
        assert!(matches!(errs[0], CodegenError::DuplicateMethod { .. }));
    }

    #[test]
    fn constants_are_deduplicated() {
        let program = lower("class A { int f() { return 5 + 5; } }").unwrap();
        let ints = program
            .constants
            .iter()
            .filter(|c| matches!(c, Constant::Int(5)))
            .count();
        assert_eq!(ints, 1);
    }
}
