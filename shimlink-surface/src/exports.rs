// Export surface extraction
//
// Two passes over the token stream: the first records top-level
// declarations so that `export { Local }` and `export default Local` can
// recover a shape, the second walks ESM `export` statements (top level only)
// and CommonJS assignments to `module.exports` / `exports` (any depth, since
// UMD wrappers put them inside a function).

use crate::cursor::TokenStream;
use crate::shape::ExportShape;
use crate::surface::{ExportSurface, ExportedSymbol};
use crate::DEFAULT_EXPORT;
use shimlink_lexer::Token;
use std::collections::HashMap;
use std::ops::Range;

/// Build the export surface of a JS/TS module source
pub fn extract_exports(source: &str) -> ExportSurface {
    ExportParser::new(source).parse()
}

struct Declarator {
    name: String,
    shape: ExportShape,
    span: Range<usize>,
}

pub struct ExportParser {
    stream: TokenStream,
    locals: HashMap<String, ExportShape>,
    surface: ExportSurface,
}

impl ExportParser {
    pub fn new(source: &str) -> Self {
        Self {
            stream: TokenStream::new(source),
            locals: HashMap::new(),
            surface: ExportSurface::new(),
        }
    }

    pub fn parse(mut self) -> ExportSurface {
        self.collect_locals();

        let mut i = 0;
        while i < self.stream.len() {
            i = match self.stream.token_at(i) {
                Some(Token::Export) if self.stream.depth_at(i) == 0 && !self.stream.is_member_access(i) => {
                    self.parse_export(i + 1)
                }
                Some(Token::Module) if !self.stream.is_member_access(i) => self.parse_module_exports(i),
                Some(Token::Exports) if !self.stream.is_member_access(i) => self.parse_exports_assignment(i),
                Some(Token::Ident(name)) if name == "Object" => self.parse_define_property(i),
                _ => i + 1,
            };
        }

        self.surface
    }

    // ==================== Local declarations ====================

    fn collect_locals(&mut self) {
        let mut found: Vec<(String, ExportShape)> = Vec::new();

        for i in 0..self.stream.len() {
            if self.stream.depth_at(i) != 0 || self.stream.is_member_access(i) {
                continue;
            }
            match self.stream.token_at(i) {
                Some(Token::Function) => {
                    if let Some(name) = self.stream.name_at(self.function_name_at(i)) {
                        found.push((name.to_string(), self.function_shape(i)));
                    }
                }
                Some(Token::Class) => {
                    if let Some(name) = self.stream.name_at(i + 1) {
                        found.push((name.to_string(), ExportShape::Class));
                    }
                }
                Some(Token::Const) | Some(Token::Let) | Some(Token::Var) => {
                    let (declarators, _) = self.parse_declarators(i + 1);
                    for decl in declarators {
                        found.push((decl.name, decl.shape));
                    }
                }
                Some(Token::Interface) => {
                    if let Some(name) = self.stream.ident_at(i + 1) {
                        found.push((name.to_string(), ExportShape::Type));
                    }
                }
                Some(Token::Type) => {
                    if let Some(name) = self.stream.ident_at(i + 1) {
                        if self.stream.check_at(i + 2, &Token::Eq) || self.stream.check_at(i + 2, &Token::Lt) {
                            found.push((name.to_string(), ExportShape::Type));
                        }
                    }
                }
                _ => {}
            }
        }

        for (name, shape) in found {
            let merged = match self.locals.get(&name) {
                Some(existing) => existing.merge(shape),
                None => shape,
            };
            self.locals.insert(name, merged);
        }
    }

    /// Index of the name in `function name` or `function* name`
    fn function_name_at(&self, function_at: usize) -> usize {
        if self.stream.check_at(function_at + 1, &Token::Star) {
            function_at + 2
        } else {
            function_at + 1
        }
    }

    /// Shape of `function name<T>(params)` starting at the `function` token
    fn function_shape(&self, function_at: usize) -> ExportShape {
        match self.stream.find_from(function_at, &Token::LParen) {
            Some(open) => ExportShape::Callable {
                arity: self.stream.count_params(open),
            },
            None => ExportShape::Callable { arity: None },
        }
    }

    /// Shape of the value expression starting at `start`
    fn classify_value(&self, start: usize) -> ExportShape {
        let mut i = start;
        if self.stream.check_at(i, &Token::Async) {
            i += 1;
        }

        match self.stream.token_at(i) {
            Some(Token::Function) => self.function_shape(i),
            Some(Token::Class) => ExportShape::Class,
            Some(Token::LParen) => match self.stream.matching_close(i) {
                Some(close) if self.stream.is_arrow_after(close) => ExportShape::Callable {
                    arity: self.stream.count_params(i),
                },
                _ => ExportShape::Unknown,
            },
            // Generic arrow: <T>(value: T) => ...
            Some(Token::Lt) => {
                let open = self.stream.find_from(i, &Token::LParen);
                match open.and_then(|open| self.stream.matching_close(open).map(|close| (open, close))) {
                    Some((open, close)) if self.stream.is_arrow_after(close) => ExportShape::Callable {
                        arity: self.stream.count_params(open),
                    },
                    _ => ExportShape::Unknown,
                }
            }
            Some(tok) if tok.as_name().is_some() && self.stream.check_at(i + 1, &Token::FatArrow) => {
                ExportShape::callable(1)
            }
            Some(tok) if tok.is_literal() => {
                if self.ends_value(i + 1) {
                    ExportShape::Constant
                } else {
                    ExportShape::Unknown
                }
            }
            Some(Token::Ident(name)) if self.ends_value(i + 1) => {
                self.locals.get(name).copied().unwrap_or(ExportShape::Unknown)
            }
            _ => ExportShape::Unknown,
        }
    }

    /// A value expression ends right before `index`
    fn ends_value(&self, index: usize) -> bool {
        matches!(
            self.stream.token_at(index),
            None | Some(Token::Semicolon)
                | Some(Token::Comma)
                | Some(Token::RBrace)
                | Some(Token::RParen)
                | Some(Token::RBracket)
                | Some(Token::Export)
                | Some(Token::Import)
                | Some(Token::Const)
                | Some(Token::Let)
                | Some(Token::Var)
                | Some(Token::Function)
                | Some(Token::Class)
        )
    }

    /// Parse `a = 1, { b, c: d } = obj, e: T` after `const`/`let`/`var`.
    /// Returns the declared names and the index after the list.
    fn parse_declarators(&self, start: usize) -> (Vec<Declarator>, usize) {
        let mut declarators = Vec::new();
        let mut i = start;

        // `const enum` in TS
        if self.stream.check_at(i, &Token::Enum) {
            if let Some(name) = self.stream.name_at(i + 1) {
                declarators.push(Declarator {
                    name: name.to_string(),
                    shape: ExportShape::Unknown,
                    span: self.stream.span_at(i + 1),
                });
            }
            return (declarators, i + 2);
        }

        loop {
            match self.stream.token_at(i) {
                Some(Token::LBrace) | Some(Token::LBracket) => {
                    let Some(close) = self.stream.matching_close(i) else {
                        return (declarators, self.stream.len());
                    };
                    declarators.extend(self.pattern_names(i, close));
                    i = close + 1;
                    if self.stream.check_at(i, &Token::Colon) {
                        i = self.stream.skip_type_annotation(i + 1);
                    }
                    if self.stream.check_at(i, &Token::Eq) {
                        i = self.stream.skip_expression(i + 1);
                    }
                }
                Some(tok) if tok.as_name().is_some() => {
                    let name = self.stream.name_at(i).unwrap_or_default().to_string();
                    let span = self.stream.span_at(i);
                    i += 1;
                    if self.stream.check_at(i, &Token::Question) {
                        i += 1;
                    }
                    if self.stream.check_at(i, &Token::Colon) {
                        i = self.stream.skip_type_annotation(i + 1);
                    }
                    let shape = if self.stream.check_at(i, &Token::Eq) {
                        let shape = self.classify_value(i + 1);
                        i = self.stream.skip_expression(i + 1);
                        shape
                    } else {
                        ExportShape::Unknown
                    };
                    declarators.push(Declarator { name, shape, span });
                }
                _ => return (declarators, i),
            }

            if self.stream.check_at(i, &Token::Comma) {
                i += 1;
            } else {
                return (declarators, i);
            }
        }
    }

    /// Binding names introduced by a destructuring pattern between `open`
    /// and `close` (one level deep)
    fn pattern_names(&self, open: usize, close: usize) -> Vec<Declarator> {
        let inner_depth = self.stream.depth_at(open) + 1;
        let mut names = Vec::new();

        for i in (open + 1)..close {
            let Some(name) = self.stream.name_at(i) else {
                continue;
            };
            let nested = self.stream.check_at(open, &Token::LBrace) && self.stream.depth_at(i) != inner_depth;
            if nested || self.stream.is_member_access(i) {
                continue;
            }
            let renamed = self.stream.check_at(i + 1, &Token::Colon);
            let is_binding = matches!(
                self.stream.token_at(i + 1),
                Some(Token::Comma) | Some(Token::RBrace) | Some(Token::RBracket) | Some(Token::Eq)
            );
            let after_default = i > 0 && self.stream.check_at(i - 1, &Token::Eq);
            if is_binding && !renamed && !after_default {
                names.push(Declarator {
                    name: name.to_string(),
                    shape: ExportShape::Unknown,
                    span: self.stream.span_at(i),
                });
            }
        }

        names
    }

    fn insert(&mut self, name: &str, shape: ExportShape, span: Range<usize>) {
        self.surface.insert(ExportedSymbol::new(name, shape, span));
    }

    fn local_shape(&self, name: &str) -> ExportShape {
        self.locals.get(name).copied().unwrap_or(ExportShape::Unknown)
    }

    // ==================== ESM ====================

    /// Parse the statement after `export`; returns the next index to scan
    fn parse_export(&mut self, start: usize) -> usize {
        let mut i = start;
        while matches!(self.stream.token_at(i), Some(Token::Declare) | Some(Token::Abstract)) {
            i += 1;
        }

        match self.stream.token_at(i) {
            Some(Token::Default) => self.parse_export_default(i),
            Some(Token::Star) => self.parse_export_star(i),
            Some(Token::LBrace) => self.parse_export_clause(i, false),
            Some(Token::Type) if self.stream.check_at(i + 1, &Token::LBrace) => {
                self.parse_export_clause(i + 1, true)
            }
            Some(Token::Type) | Some(Token::Interface) => {
                if let Some(name) = self.stream.name_at(i + 1) {
                    let name = name.to_string();
                    self.insert(&name, ExportShape::Type, self.stream.span_at(i + 1));
                }
                i + 2
            }
            Some(Token::Async) | Some(Token::Function) => {
                let function_at = if self.stream.check_at(i, &Token::Async) { i + 1 } else { i };
                let name_at = self.function_name_at(function_at);
                if let Some(name) = self.stream.name_at(name_at) {
                    let name = name.to_string();
                    let shape = self.function_shape(function_at);
                    self.insert(&name, shape, self.stream.span_at(name_at));
                }
                name_at
            }
            Some(Token::Class) => {
                if let Some(name) = self.stream.name_at(i + 1) {
                    let name = name.to_string();
                    self.insert(&name, ExportShape::Class, self.stream.span_at(i + 1));
                }
                i + 1
            }
            Some(Token::Const) | Some(Token::Let) | Some(Token::Var) => {
                let (declarators, next) = self.parse_declarators(i + 1);
                for decl in declarators {
                    self.insert(&decl.name, decl.shape, decl.span);
                }
                next.max(i + 1)
            }
            Some(Token::Enum) | Some(Token::Namespace) | Some(Token::Module) => {
                if let Some(name) = self.stream.name_at(i + 1) {
                    let name = name.to_string();
                    self.insert(&name, ExportShape::Unknown, self.stream.span_at(i + 1));
                }
                i + 1
            }
            // TS `export = Value;`
            Some(Token::Eq) => {
                let shape = self.classify_value(i + 1);
                self.insert(DEFAULT_EXPORT, shape, self.stream.span_at(i));
                i + 1
            }
            _ => i,
        }
    }

    fn parse_export_default(&mut self, default_at: usize) -> usize {
        let span = self.stream.span_at(default_at);
        let value_at = default_at + 1;

        let shape = match self.stream.token_at(value_at) {
            Some(Token::Interface) => ExportShape::Type,
            Some(Token::Abstract) => ExportShape::Class,
            Some(Token::Ident(name)) if self.ends_value(value_at + 1) => self.local_shape(name),
            _ => self.classify_value(value_at),
        };

        self.insert(DEFAULT_EXPORT, shape, span);
        value_at
    }

    fn parse_export_star(&mut self, star_at: usize) -> usize {
        // export * as ns from './x'
        if self.stream.check_at(star_at + 1, &Token::As) {
            let name_at = star_at + 2;
            let origin = self.stream.string_at(name_at + 2).map(str::to_string);
            if let Some(name) = self.exported_name_at(name_at) {
                let mut symbol = ExportedSymbol::new(name, ExportShape::Unknown, self.stream.span_at(name_at));
                if let Some(origin) = origin {
                    symbol = symbol.with_origin(origin);
                }
                self.surface.insert(symbol);
            }
            return name_at + 1;
        }

        // export * from './x'
        if self.stream.check_at(star_at + 1, &Token::From) {
            if let Some(specifier) = self.stream.string_at(star_at + 2) {
                let specifier = specifier.to_string();
                self.surface.add_star_reexport(specifier, self.stream.span_at(star_at + 2));
            }
            return star_at + 3;
        }

        star_at + 1
    }

    /// `{ a, b as c, type T, default as d } [from '...']`
    fn parse_export_clause(&mut self, open: usize, type_only: bool) -> usize {
        let Some(close) = self.stream.matching_close(open) else {
            return open + 1;
        };

        let origin = if self.stream.check_at(close + 1, &Token::From) {
            self.stream.string_at(close + 2).map(str::to_string)
        } else {
            None
        };

        let mut i = open + 1;
        while i < close {
            let mut item_type_only = type_only;
            if self.stream.check_at(i, &Token::Type)
                && !matches!(
                    self.stream.token_at(i + 1),
                    Some(Token::Comma) | Some(Token::RBrace) | Some(Token::As)
                )
            {
                item_type_only = true;
                i += 1;
            }

            let Some(local) = self.exported_name_at(i) else {
                i += 1;
                continue;
            };
            let mut exported = local.clone();
            let mut exported_at = i;
            if self.stream.check_at(i + 1, &Token::As) {
                if let Some(alias) = self.exported_name_at(i + 2) {
                    exported = alias;
                    exported_at = i + 2;
                }
            }

            let shape = if item_type_only {
                ExportShape::Type
            } else if origin.is_some() {
                ExportShape::Unknown
            } else {
                self.local_shape(&local)
            };

            let mut symbol = ExportedSymbol::new(exported, shape, self.stream.span_at(exported_at));
            if let Some(origin) = &origin {
                symbol = symbol.with_origin(origin.clone());
            }
            self.surface.insert(symbol);

            i = match self.stream.find_from(exported_at, &Token::Comma) {
                Some(comma) if comma < close => comma + 1,
                _ => close,
            };
        }

        close + 1
    }

    /// Identifier or ES2022 string name (`export { x as "some name" }`)
    fn exported_name_at(&self, index: usize) -> Option<String> {
        self.stream
            .name_at(index)
            .or_else(|| self.stream.string_at(index))
            .map(str::to_string)
    }

    // ==================== CommonJS ====================

    /// `module.exports = ...` and `module.exports.name = ...`
    fn parse_module_exports(&mut self, module_at: usize) -> usize {
        if !(self.stream.check_at(module_at + 1, &Token::Dot) && self.stream.check_at(module_at + 2, &Token::Exports)) {
            return module_at + 1;
        }

        let after = module_at + 3;
        match self.stream.token_at(after) {
            Some(Token::Eq) => self.parse_module_exports_value(after + 1),
            Some(Token::Dot) => self.parse_named_assignment(after + 1),
            _ => after,
        }
    }

    /// `exports.name = ...`
    fn parse_exports_assignment(&mut self, exports_at: usize) -> usize {
        if self.stream.check_at(exports_at + 1, &Token::Dot) {
            self.parse_named_assignment(exports_at + 2)
        } else {
            exports_at + 1
        }
    }

    fn parse_named_assignment(&mut self, name_at: usize) -> usize {
        if !self.stream.check_at(name_at + 1, &Token::Eq) {
            return name_at;
        }
        if let Some(name) = self.stream.name_at(name_at) {
            let name = name.to_string();
            if name != "__esModule" {
                let shape = self.classify_value(name_at + 2);
                self.insert(&name, shape, self.stream.span_at(name_at));
            }
        }
        name_at + 2
    }

    fn parse_module_exports_value(&mut self, value_at: usize) -> usize {
        match self.stream.token_at(value_at) {
            Some(Token::LBrace) => self.parse_exports_object(value_at),
            // module.exports = require('./impl')
            Some(Token::Require) if self.stream.check_at(value_at + 1, &Token::LParen) => {
                if let Some(specifier) = self.stream.string_at(value_at + 2) {
                    let specifier = specifier.to_string();
                    self.surface.add_require_reexport(specifier, self.stream.span_at(value_at + 2));
                }
                value_at + 3
            }
            _ => {
                let shape = self.classify_value(value_at);
                self.insert(DEFAULT_EXPORT, shape, self.stream.span_at(value_at));
                value_at
            }
        }
    }

    /// `module.exports = { a, b: value, c() {}, ...rest }`
    fn parse_exports_object(&mut self, open: usize) -> usize {
        let Some(close) = self.stream.matching_close(open) else {
            return open + 1;
        };

        let mut i = open + 1;
        while i < close {
            if self.stream.check_at(i, &Token::Ellipsis) {
                i = self.stream.skip_expression(i + 1);
                i = if self.stream.check_at(i, &Token::Comma) { i + 1 } else { close };
                continue;
            }

            let span = self.stream.span_at(i);
            let next = match self.exported_name_at(i) {
                Some(key) if self.stream.check_at(i + 1, &Token::Colon) => {
                    let shape = self.classify_value(i + 2);
                    self.insert(&key, shape, span);
                    self.stream.skip_expression(i + 2)
                }
                // method shorthand
                Some(key) if self.stream.check_at(i + 1, &Token::LParen) => {
                    let shape = ExportShape::Callable {
                        arity: self.stream.count_params(i + 1),
                    };
                    self.insert(&key, shape, span);
                    self.stream.skip_expression(i + 1)
                }
                Some(key)
                    if matches!(
                        self.stream.token_at(i + 1),
                        Some(Token::Comma) | Some(Token::RBrace)
                    ) =>
                {
                    let shape = self.local_shape(&key);
                    self.insert(&key, shape, span);
                    i + 1
                }
                _ => self.stream.skip_expression(i),
            };

            i = if self.stream.check_at(next, &Token::Comma) { next + 1 } else { close };
        }

        close + 1
    }

    /// Babel output: `Object.defineProperty(exports, "Name", { get: ... })`
    fn parse_define_property(&mut self, object_at: usize) -> usize {
        let is_define = self.stream.check_at(object_at + 1, &Token::Dot)
            && self.stream.ident_at(object_at + 2) == Some("defineProperty")
            && self.stream.check_at(object_at + 3, &Token::LParen)
            && self.stream.check_at(object_at + 4, &Token::Exports)
            && self.stream.check_at(object_at + 5, &Token::Comma);
        if !is_define {
            return object_at + 1;
        }

        if let Some(name) = self.stream.string_at(object_at + 6) {
            let name = name.to_string();
            if name != "__esModule" {
                self.insert(&name, ExportShape::Unknown, self.stream.span_at(object_at + 6));
            }
        }
        object_at + 7
    }
}
