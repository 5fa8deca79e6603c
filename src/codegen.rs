//! Renders an IR module into a single C translation unit.
//!
//! Two buffers are maintained: `decl` receives typedefs and forward
//! declarations, `source` receives definitions; the result is their
//! concatenation. A krug `main` is renamed `krug_main` and a C `main`
//! stub is generated that stashes argc/argv in module globals.

use serde::{Deserialize, Serialize};

use crate::ir::instr::{Alloca, Block, Instruction, Local};
use crate::ir::module::{Function, Module};
use crate::ir::types::Type;
use crate::ir::value::Value;

const HEADERS: &[&str] = &["stdio.h", "stdbool.h", "stdint.h", "stdlib.h", "string.h"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CodegenOptions {
    pub tab_size: usize,
    pub minify: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            tab_size: 4,
            minify: false,
        }
    }
}

pub fn codegen(module: &Module, opts: &CodegenOptions) -> String {
    let mut emitter = Emitter {
        module,
        decl: String::new(),
        source: String::new(),
        target: Target::Decl,
        opts: *opts,
    };
    emitter.run();
    emitter.decl + &emitter.source
}

#[derive(Clone, Copy, PartialEq)]
enum Target {
    Decl,
    Source,
}

struct Emitter<'m> {
    module: &'m Module,
    decl: String,
    source: String,
    target: Target,
    opts: CodegenOptions,
}

impl<'m> Emitter<'m> {
    fn retarget(&mut self, to: Target) {
        self.target = to;
    }

    fn write(&mut self, text: &str) {
        match self.target {
            Target::Decl => self.decl.push_str(text),
            Target::Source => self.source.push_str(text),
        }
    }

    fn writeln(&mut self, text: &str) {
        self.write(text);
        if self.opts.minify {
            self.write(" ");
        } else {
            self.write("\n");
        }
    }

    /// A line that survives minification; preprocessor directives and
    /// declarations are line-based in C.
    fn hardline(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }

    fn writetln(&mut self, level: usize, text: &str) {
        if !self.opts.minify {
            let indent = " ".repeat(self.opts.tab_size * level);
            self.write(&indent);
        }
        self.writeln(text);
    }

    // ------------------------------------------------------------------
    // types
    // ------------------------------------------------------------------

    fn type_name(&self, t: &Type) -> String {
        match t {
            Type::Void => "void".to_string(),
            Type::Integer { width, signed } => {
                format!("{}int{}_t", if *signed { "" } else { "u" }, width)
            }
            Type::Float { width } => {
                if *width == 32 {
                    "float".to_string()
                } else {
                    "double".to_string()
                }
            }
            Type::Pointer { base } => format!("{}*", self.type_name(base)),
            Type::Reference { name } | Type::Structure { name } => name.clone(),
            Type::Tuple { types } => {
                let mut fields = String::new();
                for (idx, t) in types.iter().enumerate() {
                    fields.push_str(&format!("{} _{}; ", self.type_name(t), idx));
                }
                format!("struct {{ {}}}", fields)
            }
            // array types are rewritten as a suffix on the declared name.
            Type::Array { base, .. } => self.type_name(base),
            Type::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.type_name(p))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} (*)({})", self.type_name(ret), params)
            }
        }
    }

    /// C declarator syntax: array sizes trail the name, function pointers
    /// wrap it.
    fn binding(&self, t: Option<&Type>, name: &str) -> String {
        let Some(mut base) = t else {
            return format!("int {}", name);
        };

        let mut suffix = String::new();
        while let Type::Array { base: inner, size } = base {
            suffix.push_str(&format!("[{}]", self.expr(size)));
            base = inner;
        }

        if let Type::Function { params, ret } = base {
            let params = params
                .iter()
                .map(|p| self.type_name(p))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("{} (*{})({})", self.type_name(ret), name, params);
        }

        format!("{} {}{}", self.type_name(base), name, suffix)
    }

    // ------------------------------------------------------------------
    // values
    // ------------------------------------------------------------------

    fn expr(&self, value: &Value) -> String {
        match value {
            Value::Integer { value } => value.clone(),
            Value::Floating { value } => format!("{}", value),
            Value::Str { value } => {
                // backtick strings carry C-hostile quotes.
                if value.starts_with('`') && value.ends_with('`') && value.len() >= 2 {
                    format!("\"{}\"", &value[1..value.len() - 1])
                } else {
                    value.clone()
                }
            }
            Value::Char { value } => value.clone(),
            Value::Identifier { name } => mangle(&name.value),
            Value::Grouping { value } => format!("({})", self.expr(value)),
            Value::Binary { lhand, op, rhand } => {
                format!("({}{}{})", self.expr(lhand), op, self.expr(rhand))
            }
            Value::Unary { op, value } => {
                let op = if op == "@" { "*" } else { op.as_str() };
                format!("({}{})", op, self.expr(value))
            }
            Value::Call { left, params } => {
                let args = params
                    .iter()
                    .map(|p| self.expr(p))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", self.expr(left), args)
            }
            Value::Path { values } => values
                .iter()
                .map(|v| self.expr(v))
                .collect::<Vec<_>>()
                .join("."),
            Value::Index { left, sub } => format!("{}[{}]", self.expr(left), self.expr(sub)),
            Value::Assign { lhand, op, rhand } => {
                format!("{} {} {}", self.expr(lhand), op, self.expr(rhand))
            }
            Value::Builtin {
                name,
                type_node,
                args,
            } => self.builtin(name, type_node.as_ref(), args),
            Value::Init { values, .. } => {
                let body = values
                    .iter()
                    .map(|v| self.expr(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", body)
            }
        }
    }

    fn builtin(&self, name: &str, type_node: Option<&Type>, args: &[Value]) -> String {
        let subject = type_node
            .map(|t| self.type_name(t))
            .or_else(|| args.first().map(|a| self.expr(a)));

        match name {
            "sizeof" => format!("sizeof({})", subject.unwrap_or_default()),
            "alloc" | "make" => match args.first() {
                Some(count) if type_node.is_some() => format!(
                    "malloc(sizeof({}) * ({}))",
                    subject.clone().unwrap_or_default(),
                    self.expr(count)
                ),
                _ => format!("malloc(sizeof({}))", subject.unwrap_or_default()),
            },
            "free" | "delete" => format!("free({})", subject.unwrap_or_default()),
            "ref" => format!("&{}", subject.unwrap_or_default()),
            "len" => {
                let arg = subject.unwrap_or_default();
                format!("(sizeof({}) / sizeof(({})[0]))", arg, arg)
            }
            _ => {
                let rendered = args
                    .iter()
                    .map(|a| self.expr(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", name, rendered)
            }
        }
    }

    // ------------------------------------------------------------------
    // instructions
    // ------------------------------------------------------------------

    fn emit_local(&mut self, level: usize, local: &Local) {
        let modifier = if local.mutable { "" } else { "const " };
        let binding = self.binding(local.type_node.as_ref(), &local.name.value);
        let line = match &local.val {
            Some(val) => format!("{}{} = {};", modifier, binding, self.expr(val)),
            None => format!("{}{};", modifier, binding),
        };
        self.writetln(level, &line);
    }

    fn emit_alloca(&mut self, level: usize, alloca: &Alloca) {
        let binding = self.binding(alloca.type_node.as_ref(), &alloca.name.value);
        let line = format!("{} = malloc(sizeof(*{}));", binding, alloca.name.value);
        self.writetln(level, &line);
    }

    fn emit_instr(&mut self, level: usize, instr: &Instruction) {
        match instr {
            Instruction::Local(local) => self.emit_local(level, local),
            Instruction::Alloca(alloca) => self.emit_alloca(level, alloca),
            Instruction::Assign { lhand, op, rhand } => {
                let line = format!("{} {} {};", self.expr(lhand), op, self.expr(rhand));
                self.writetln(level, &line);
            }
            Instruction::Expression { value } => {
                let line = format!("{};", self.expr(value));
                self.writetln(level, &line);
            }
            Instruction::Return { val } => {
                let line = match val {
                    Some(val) => format!("return {};", self.expr(val)),
                    None => "return;".to_string(),
                };
                self.writetln(level, &line);
            }
            Instruction::Next => self.writetln(level, "continue;"),
            Instruction::Break => self.writetln(level, "break;"),
            Instruction::Loop { body } => {
                self.writet(level, "for (;;) ");
                self.emit_block(level, body);
            }
            Instruction::WhileLoop { cond, post, body } => {
                let post = post.as_ref().map(|p| self.expr(p)).unwrap_or_default();
                let header = format!("for (; {}; {}) ", self.expr(cond), post);
                self.writet(level, &header);
                self.emit_block(level, body);
            }
            Instruction::If(iff) => {
                let header = format!("if ({}) ", self.expr(&iff.cond));
                self.writet(level, &header);
                self.emit_block_no_newline(level, &iff.true_block);
                for elif in &iff.else_ifs {
                    let header = format!(" else if ({}) ", self.expr(&elif.cond));
                    self.write(&header);
                    self.emit_block_no_newline(level, &elif.body);
                }
                if let Some(else_block) = &iff.else_block {
                    self.write(" else ");
                    self.emit_block_no_newline(level, else_block);
                }
                self.writeln("");
            }
            Instruction::Block(block) => {
                self.writet(level, "");
                self.emit_block(level, block);
            }
            Instruction::Label { name } => {
                let line = format!("{}:;", name.value);
                self.writetln(level, &line);
            }
            Instruction::Jump { location } => {
                let line = format!("goto {};", location.value);
                self.writetln(level, &line);
            }
            Instruction::Defer(def) => {
                // an inline defer instruction only occurs nested inside
                // another deferred statement; emit its payload in place.
                if let Some(stat) = &def.stat {
                    self.emit_instr(level, stat);
                }
                if let Some(block) = &def.block {
                    self.writet(level, "");
                    self.emit_block(level, block);
                }
            }
            // type aliases are emitted from the global block up front.
            Instruction::TypeAlias(_) => {}
        }
    }

    /// Writes indentation plus `text` without a line break, for brace
    /// headers.
    fn writet(&mut self, level: usize, text: &str) {
        if !self.opts.minify {
            let indent = " ".repeat(self.opts.tab_size * level);
            self.write(&indent);
        }
        self.write(text);
    }

    fn emit_block(&mut self, level: usize, block: &Block) {
        self.emit_block_no_newline(level, block);
        self.writeln("");
    }

    fn emit_block_no_newline(&mut self, level: usize, block: &Block) {
        self.writeln("{");
        for instr in &block.instr {
            self.emit_instr(level + 1, instr);
        }

        // deferred statements unwind in reverse order, ahead of the
        // block's return.
        for def in block.defer_stack.iter().rev() {
            if let Some(stat) = &def.stat {
                self.emit_instr(level + 1, stat);
            }
            if let Some(inner) = &def.block {
                self.writet(level + 1, "");
                self.emit_block(level + 1, inner);
            }
        }

        if let Some(ret) = &block.return_instr {
            self.emit_instr(level + 1, ret);
        }

        self.writet(level, "}");
    }

    // ------------------------------------------------------------------
    // top level
    // ------------------------------------------------------------------

    fn arg_list(&self, func: &Function) -> String {
        func.params
            .iter()
            .map(|p| self.binding(p.type_node.as_ref(), &p.name.value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn emit_func(&mut self, func: &Function, name: &str) {
        let ret = self.type_name(&func.return_type);
        let args = self.arg_list(func);

        // write the prototype to the decl part.
        self.retarget(Target::Decl);
        self.hardline(&format!("{} {}({});", ret, name, args));

        // write the definition to the source part.
        self.retarget(Target::Source);
        self.write(&format!("{} {}({}) ", ret, name, args));
        self.emit_block_no_newline(0, &func.body);
        self.hardline("");
    }

    fn emit_structures(&mut self) {
        let module = self.module;
        self.retarget(Target::Decl);
        for name in &module.structure_order {
            let Some(structure) = module.structures.get(&name.value) else {
                continue;
            };
            self.write("typedef struct { ");
            for field in structure.fields.iter() {
                let binding = self.binding(field.type_node.as_ref(), &field.name.value);
                self.write(&format!("{}; ", binding));
            }
            self.hardline(&format!("}} {};", name.value));
        }
    }

    fn emit_type_aliases(&mut self) {
        let module = self.module;
        self.retarget(Target::Decl);
        for instr in &module.global.instr {
            if let Instruction::TypeAlias(alias) = instr {
                let binding = self.binding(Some(&alias.type_node), &alias.name.value);
                self.hardline(&format!("typedef {};", binding));
            }
        }
    }

    fn emit_main_stub(&mut self, krug_main: &Function) {
        self.retarget(Target::Decl);
        self.hardline("static int __argc;");
        self.hardline("static char** __argv;");

        self.retarget(Target::Source);
        self.write("int main(int argc, char** argv) ");
        self.writeln("{");
        self.writetln(1, "__argc = argc;");
        self.writetln(1, "__argv = argv;");
        if krug_main.return_type == Type::Void {
            self.writetln(1, "krug_main();");
            self.writetln(1, "return 0;");
        } else {
            self.writetln(1, "return krug_main();");
        }
        self.hardline("}");
    }

    fn run(&mut self) {
        let module = self.module;

        self.retarget(Target::Decl);
        for header in HEADERS {
            self.hardline(&format!("#include <{}>", header));
        }

        self.emit_type_aliases();
        self.emit_structures();

        for name in &module.impl_order {
            if let Some(imp) = module.impls.get(&name.value) {
                for method_name in &imp.method_order {
                    if let Some(method) = imp.methods.get(&method_name.value) {
                        let mangled = format!("{}_{}", name.value, method_name.value);
                        self.emit_func(method, &mangled);
                    }
                }
            }
        }

        let mut krug_main = None;
        for name in &module.function_order {
            if let Some(func) = module.functions.get(&name.value) {
                if name.value == "main" {
                    krug_main = Some(func);
                }
                self.emit_func(func, &mangle(&name.value));
            }
        }

        if let Some(func) = krug_main {
            self.emit_main_stub(func);
        }
    }
}

/// `main` belongs to the generated runtime stub; the user's entry point
/// is renamed out of its way.
fn mangle(name: &str) -> String {
    if name == "main" {
        "krug_main".to_string()
    } else {
        name.to_string()
    }
}
