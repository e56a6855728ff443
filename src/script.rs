//! Restricted interpreter for `.js` files.
//!
//! Scripts get a small JavaScript-flavoured language: variables, arithmetic,
//! string concatenation, comparisons and a handful of builtins that can print
//! lines or open windows through a [`ScriptSink`]. Nothing in it can reach the
//! page, storage or network.

use crate::error::ShellError;
use std::collections::HashMap;
use std::fmt;

/// Names that would reach host capabilities in a real browser.
const FORBIDDEN: &[&str] = &[
    "eval",
    "Function",
    "document",
    "window",
    "globalThis",
    "localStorage",
    "sessionStorage",
    "XMLHttpRequest",
    "fetch",
    "atob",
    "btoa",
    "import",
    "require",
    "setTimeout",
    "setInterval",
];

/// Where script side effects go.
pub trait ScriptSink {
    fn print(&mut self, text: &str);
    fn open_window(&mut self, title: &str, content: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).into()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null | Value::Undefined => false,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Str(s) if s.trim().is_empty() => 0.0,
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Null => 0.0,
            Value::Undefined => f64::NAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Dot,
    Sep,
}

const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "!", "=",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ShellError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' | ';' => {
                if depth == 0 || c == ';' {
                    tokens.push(Token::Sep);
                }
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '(' => {
                depth += 1;
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' if !chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()) => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(eval_err("unterminated string literal")),
                        Some(&q) if q == quote => break,
                        Some(&'\\') => {
                            let escaped = chars
                                .get(i + 1)
                                .ok_or_else(|| eval_err("unterminated string literal"))?;
                            text.push(match *escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                            i += 2;
                        }
                        Some(&other) => {
                            text.push(other);
                            i += 1;
                        }
                    }
                }
                i += 1;
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| eval_err(&format!("invalid number '{}'", literal)))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| eval_err(&format!("unexpected character '{}'", c)))?;
                tokens.push(Token::Op(*op));
                i += op.len();
            }
        }
    }
    Ok(tokens)
}

fn eval_err(msg: &str) -> ShellError {
    ShellError::Evaluation(msg.to_string())
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Var(String),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

fn binding_power(op: &str) -> Option<u8> {
    match op {
        "||" => Some(1),
        "&&" => Some(2),
        "==" | "!=" | "===" | "!==" => Some(3),
        "<" | "<=" | ">" | ">=" => Some(4),
        "+" | "-" => Some(5),
        "*" | "/" | "%" => Some(6),
        _ => None,
    }
}

/// Deepest expression the parser accepts. Evaluation recurses along the
/// same tree, so this bounds both.
const MAX_NESTING: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, want: Token) -> Result<(), ShellError> {
        match self.bump() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(eval_err(&format!("expected {:?}, found {:?}", want, t))),
            None => Err(eval_err(&format!("expected {:?}", want))),
        }
    }

    fn ident(&mut self) -> Result<String, ShellError> {
        match self.bump() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(eval_err(&format!("expected a name, found {:?}", other))),
        }
    }

    fn statements(&mut self) -> Result<Vec<Stmt>, ShellError> {
        let mut out = Vec::new();
        while let Some(token) = self.peek() {
            if *token == Token::Sep {
                self.pos += 1;
                continue;
            }
            out.push(self.statement()?);
            match self.bump() {
                None | Some(Token::Sep) => {}
                Some(t) => return Err(eval_err(&format!("unexpected {:?}", t))),
            }
        }
        Ok(out)
    }

    fn statement(&mut self) -> Result<Stmt, ShellError> {
        if let Some(Token::Ident(word)) = self.peek() {
            if matches!(word.as_str(), "let" | "const" | "var") {
                self.pos += 1;
                let name = self.ident()?;
                self.expect(Token::Op("="))?;
                return Ok(Stmt::Assign(name, self.expr(0)?));
            }
            if self.tokens.get(self.pos + 1) == Some(&Token::Op("=")) {
                let name = self.ident()?;
                self.pos += 1;
                return Ok(Stmt::Assign(name, self.expr(0)?));
            }
        }
        Ok(Stmt::Expr(self.expr(0)?))
    }

    fn nest(&mut self) -> Result<(), ShellError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(eval_err("expression nested too deeply"));
        }
        Ok(())
    }

    fn expr(&mut self, min_bp: u8) -> Result<Expr, ShellError> {
        self.nest()?;
        let expr = self.climb(min_bp);
        self.depth -= 1;
        expr
    }

    fn climb(&mut self, min_bp: u8) -> Result<Expr, ShellError> {
        let mut lhs = self.unary()?;
        // Left-associative chains deepen the tree without recursing here.
        let mut chain = 0;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            let Some(bp) = binding_power(op) else { break };
            if bp <= min_bp {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(bp)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
            chain += 1;
            if self.depth + chain > MAX_NESTING {
                return Err(eval_err("expression nested too deeply"));
            }
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ShellError> {
        match self.peek() {
            Some(Token::Op(op @ ("-" | "!" | "+"))) => {
                let op = *op;
                self.pos += 1;
                self.nest()?;
                let inner = self.unary();
                self.depth -= 1;
                Ok(Expr::Unary(op, Box::new(inner?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ShellError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::LParen) => {
                let inner = self.expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let mut path = name;
                while self.peek() == Some(&Token::Dot) {
                    self.pos += 1;
                    path.push('.');
                    path.push_str(&self.ident()?);
                }
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.arguments()?;
                    return Ok(Expr::Call(path, args));
                }
                Ok(match path.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    "undefined" => Expr::Literal(Value::Undefined),
                    _ => Expr::Var(path),
                })
            }
            other => Err(eval_err(&format!("unexpected {:?}", other))),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ShellError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr(0)?);
            match self.bump() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                other => return Err(eval_err(&format!("expected ',' or ')', found {:?}", other))),
            }
        }
    }
}

pub struct ScriptInterpreter {
    globals: HashMap<String, Value>,
}

impl Default for ScriptInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptInterpreter {
    pub fn new() -> Self {
        ScriptInterpreter {
            globals: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Run a whole script. Parsing happens up front, so a syntax error
    /// anywhere means nothing runs; a runtime error stops at that statement.
    pub fn run<S: ScriptSink>(&mut self, source: &str, sink: &mut S) -> Result<(), ShellError> {
        let tokens = tokenize(source)?;
        for token in &tokens {
            if let Token::Ident(name) = token {
                if FORBIDDEN.contains(&name.as_str()) {
                    return Err(eval_err(&format!("Forbidden operation: {}", name)));
                }
            }
        }
        let statements = Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
        .statements()?;
        for stmt in statements {
            match stmt {
                Stmt::Assign(name, expr) => {
                    let value = self.eval(&expr, sink)?;
                    self.globals.insert(name, value);
                }
                Stmt::Expr(expr) => {
                    self.eval(&expr, sink)?;
                }
            }
        }
        Ok(())
    }

    fn eval<S: ScriptSink>(&mut self, expr: &Expr, sink: &mut S) -> Result<Value, ShellError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Var(name) => self
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| eval_err(&format!("{} is not defined", name))),
            Expr::Unary(op, inner) => {
                let v = self.eval(inner, sink)?;
                Ok(match *op {
                    "!" => Value::Bool(!v.truthy()),
                    "-" => Value::Number(-v.to_number()),
                    _ => Value::Number(v.to_number()),
                })
            }
            Expr::Binary("&&", lhs, rhs) => {
                let l = self.eval(lhs, sink)?;
                if l.truthy() {
                    self.eval(rhs, sink)
                } else {
                    Ok(l)
                }
            }
            Expr::Binary("||", lhs, rhs) => {
                let l = self.eval(lhs, sink)?;
                if l.truthy() {
                    Ok(l)
                } else {
                    self.eval(rhs, sink)
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs, sink)?;
                let r = self.eval(rhs, sink)?;
                Ok(binary(op, l, r))
            }
            Expr::Call(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, sink)?);
                }
                call(name, values, sink)
            }
        }
    }
}

fn binary(op: &str, l: Value, r: Value) -> Value {
    match op {
        "+" => match (&l, &r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{}{}", l, r)),
            _ => Value::Number(l.to_number() + r.to_number()),
        },
        "-" => Value::Number(l.to_number() - r.to_number()),
        "*" => Value::Number(l.to_number() * r.to_number()),
        "/" => Value::Number(l.to_number() / r.to_number()),
        "%" => Value::Number(l.to_number() % r.to_number()),
        "===" | "!==" => {
            let same = l == r;
            Value::Bool(if op == "===" { same } else { !same })
        }
        "==" | "!=" => {
            let same = match (&l, &r) {
                (Value::Str(a), Value::Str(b)) => a == b,
                (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
                (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => false,
                _ => l.to_number() == r.to_number(),
            };
            Value::Bool(if op == "==" { same } else { !same })
        }
        _ => {
            let ordering = match (&l, &r) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => l.to_number().partial_cmp(&r.to_number()),
            };
            Value::Bool(match (op, ordering) {
                (_, None) => false,
                ("<", Some(o)) => o.is_lt(),
                ("<=", Some(o)) => o.is_le(),
                (">", Some(o)) => o.is_gt(),
                (_, Some(o)) => o.is_ge(),
            })
        }
    }
}

fn call<S: ScriptSink>(name: &str, args: Vec<Value>, sink: &mut S) -> Result<Value, ShellError> {
    let number = |i: usize| args.get(i).map(Value::to_number).unwrap_or(f64::NAN);
    let value = match name {
        "alert" | "print" => {
            sink.print(&args.first().unwrap_or(&Value::Undefined).to_string());
            Value::Undefined
        }
        "console.log" => {
            let line = args
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            sink.print(&line);
            Value::Undefined
        }
        "createWindow" => {
            // Accepts (title, content) or (icon, title, content).
            let tail = &args[args.len().saturating_sub(2)..];
            match tail {
                [title, content] => sink.open_window(&title.to_string(), &content.to_string()),
                _ => return Err(eval_err("createWindow expects a title and content")),
            }
            Value::Undefined
        }
        "String" => Value::Str(args.first().map(|v| v.to_string()).unwrap_or_default()),
        "Number" => Value::Number(args.first().map(Value::to_number).unwrap_or(0.0)),
        "Math.floor" => Value::Number(number(0).floor()),
        "Math.ceil" => Value::Number(number(0).ceil()),
        "Math.round" => Value::Number((number(0) + 0.5).floor()),
        "Math.abs" => Value::Number(number(0).abs()),
        "Math.sqrt" => Value::Number(number(0).sqrt()),
        "Math.min" => Value::Number(
            args.iter()
                .map(Value::to_number)
                .fold(f64::INFINITY, f64::min),
        ),
        "Math.max" => Value::Number(
            args.iter()
                .map(Value::to_number)
                .fold(f64::NEG_INFINITY, f64::max),
        ),
        _ => return Err(eval_err(&format!("{} is not a function", name))),
    };
    Ok(value)
}
