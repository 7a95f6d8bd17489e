// Import use extraction: which symbols application code takes from a module

use crate::cursor::TokenStream;
use crate::DEFAULT_EXPORT;
use shimlink_lexer::Token;
use std::ops::Range;

/// One symbol application code takes from a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSymbol {
    /// Module specifier exactly as written (`'react-native-maps'`)
    pub module: String,
    /// Exported name being used; `default` for default imports
    pub symbol: String,
    /// Byte range of the use in the importing source
    pub span: Range<usize>,
}

/// Namespace-like binding whose member accesses are symbol uses
/// (`import * as Maps from '...'`, `const Maps = require('...')`)
struct NamespaceBinding {
    name: String,
    module: String,
    declared_at: usize,
}

/// Collect every runtime symbol a source imports.
///
/// Type-only imports are skipped: bundlers erase them, so a shim never has
/// to provide them.
pub fn extract_imports(source: &str) -> Vec<ImportedSymbol> {
    let mut scanner = ImportScanner {
        stream: TokenStream::new(source),
        uses: Vec::new(),
        namespaces: Vec::new(),
    };
    scanner.scan();
    scanner.uses
}

struct ImportScanner {
    stream: TokenStream,
    uses: Vec<ImportedSymbol>,
    namespaces: Vec<NamespaceBinding>,
}

impl ImportScanner {
    fn scan(&mut self) {
        for i in 0..self.stream.len() {
            match self.stream.token_at(i) {
                Some(Token::Import)
                    if !self.stream.is_member_access(i)
                        && !self.stream.check_at(i + 1, &Token::LParen)
                        && !self.stream.check_at(i + 1, &Token::Dot) =>
                {
                    self.parse_import(i)
                }
                Some(Token::Export) if self.stream.depth_at(i) == 0 => self.parse_reexport(i),
                Some(Token::Require)
                    if !self.stream.is_member_access(i)
                        && self.stream.check_at(i + 1, &Token::LParen)
                        && self.stream.check_at(i + 3, &Token::RParen) =>
                {
                    self.parse_require(i)
                }
                _ => {}
            }
        }

        self.collect_namespace_members();
        self.uses.sort_by_key(|u| u.span.start);
    }

    fn record(&mut self, module: &str, symbol: &str, at: usize) {
        self.uses.push(ImportedSymbol {
            module: module.to_string(),
            symbol: symbol.to_string(),
            span: self.stream.span_at(at),
        });
    }

    /// `import X, { A, B as C } from 'm'`, `import * as NS from 'm'`
    fn parse_import(&mut self, import_at: usize) {
        let start = import_at + 1;

        // `import type X from`, `import type { X } from`; but `import type from 'm'`
        // binds a default import named `type`
        if self.stream.check_at(start, &Token::Type)
            && !self.stream.check_at(start + 1, &Token::From)
            && !self.stream.check_at(start + 1, &Token::Comma)
        {
            return;
        }

        // side-effect import
        if self.stream.string_at(start).is_some() {
            return;
        }

        let Some(from_at) = self.stream.find_from(start, &Token::From) else {
            return;
        };
        let Some(module) = self.stream.string_at(from_at + 1).map(str::to_string) else {
            return;
        };

        let mut i = start;
        while i < from_at {
            match self.stream.token_at(i) {
                Some(Token::LBrace) => {
                    let close = self.stream.matching_close(i).unwrap_or(from_at).min(from_at);
                    self.parse_named_list(i, close, &module);
                    i = close + 1;
                }
                Some(Token::Star) => {
                    if self.stream.check_at(i + 1, &Token::As) {
                        if let Some(name) = self.stream.name_at(i + 2) {
                            self.namespaces.push(NamespaceBinding {
                                name: name.to_string(),
                                module: module.clone(),
                                declared_at: i + 2,
                            });
                        }
                    }
                    i += 3;
                }
                Some(Token::Comma) => i += 1,
                Some(tok) if tok.as_name().is_some() => {
                    self.record(&module, DEFAULT_EXPORT, i);
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }

    /// `{ A, B as C, type T, default as D }` between `open` and `close`;
    /// records the imported (not the local) names
    fn parse_named_list(&mut self, open: usize, close: usize, module: &str) {
        let mut i = open + 1;
        while i < close {
            let type_only = self.stream.check_at(i, &Token::Type)
                && !matches!(
                    self.stream.token_at(i + 1),
                    Some(Token::Comma) | Some(Token::RBrace) | Some(Token::As)
                );

            let name_at = if type_only { i + 1 } else { i };
            let name = self
                .stream
                .name_at(name_at)
                .or_else(|| self.stream.string_at(name_at))
                .map(str::to_string);
            if let (Some(name), false) = (name, type_only) {
                self.record(module, &name, name_at);
            }

            i = match self.stream.find_from(name_at, &Token::Comma) {
                Some(comma) if comma < close => comma + 1,
                _ => close,
            };
        }
    }

    /// `export { A, B as C } from 'm'` re-exports count as uses of `m`
    fn parse_reexport(&mut self, export_at: usize) {
        let open = export_at + 1;
        if !self.stream.check_at(open, &Token::LBrace) {
            return;
        }
        let Some(close) = self.stream.matching_close(open) else {
            return;
        };
        if !self.stream.check_at(close + 1, &Token::From) {
            return;
        }
        if let Some(module) = self.stream.string_at(close + 2).map(str::to_string) {
            self.parse_named_list(open, close, &module);
        }
    }

    /// `const { A, B: b } = require('m')`, `const M = require('m')`,
    /// `require('m').A`
    fn parse_require(&mut self, require_at: usize) {
        let Some(module) = self.stream.string_at(require_at + 2).map(str::to_string) else {
            return;
        };

        // require('m').A
        if self.stream.check_at(require_at + 4, &Token::Dot) {
            if let Some(name) = self.stream.name_at(require_at + 5) {
                let name = name.to_string();
                self.record(&module, &name, require_at + 5);
            }
            return;
        }

        if require_at < 2 || !self.stream.check_at(require_at - 1, &Token::Eq) {
            return;
        }
        let binding_at = require_at - 2;

        match self.stream.token_at(binding_at) {
            Some(Token::RBrace) => {
                if let Some(open) = self.matching_open(binding_at) {
                    self.parse_require_pattern(open, binding_at, &module);
                }
            }
            Some(Token::Ident(name)) => {
                self.namespaces.push(NamespaceBinding {
                    name: name.clone(),
                    module,
                    declared_at: binding_at,
                });
            }
            _ => {}
        }
    }

    /// Keys of a destructuring pattern `{ A, B: b, C = x, ...rest }`
    fn parse_require_pattern(&mut self, open: usize, close: usize, module: &str) {
        let inner_depth = self.stream.depth_at(open) + 1;
        for i in (open + 1)..close {
            if self.stream.depth_at(i) != inner_depth {
                continue;
            }
            let Some(name) = self.stream.name_at(i) else {
                continue;
            };
            let prev = self.stream.token_at(i - 1);
            let is_key = matches!(prev, Some(Token::LBrace) | Some(Token::Comma));
            let is_rest = matches!(prev, Some(Token::Ellipsis));
            if is_key && !is_rest {
                let name = name.to_string();
                self.record(module, &name, i);
            }
        }
    }

    fn matching_open(&self, close: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in (0..=close).rev() {
            match self.stream.token_at(i)? {
                Token::RParen | Token::RBrace | Token::RBracket => depth += 1,
                Token::LParen | Token::LBrace | Token::LBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Every `NS.member` after a namespace binding is a use of `member`
    fn collect_namespace_members(&mut self) {
        let mut found = Vec::new();

        for binding in &self.namespaces {
            for i in (binding.declared_at + 1)..self.stream.len() {
                if self.stream.ident_at(i) != Some(binding.name.as_str())
                    || self.stream.is_member_access(i)
                    || !self.stream.check_at(i + 1, &Token::Dot)
                {
                    continue;
                }
                if let Some(member) = self.stream.name_at(i + 2) {
                    found.push((binding.module.clone(), member.to_string(), i + 2));
                }
            }
        }

        for (module, member, at) in found {
            self.record(&module, &member, at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(source: &str, module: &str) -> Vec<String> {
        extract_imports(source)
            .into_iter()
            .filter(|u| u.module == module)
            .map(|u| u.symbol)
            .collect()
    }

    #[test]
    fn test_named_and_default_imports() {
        let source = "import MapView, { Marker, PROVIDER_GOOGLE as Google } from 'react-native-maps';";
        assert_eq!(
            symbols(source, "react-native-maps"),
            vec!["default", "Marker", "PROVIDER_GOOGLE"]
        );
    }

    #[test]
    fn test_type_imports_are_skipped() {
        let source = "import type { Region } from 'react-native-maps';\n\
                      import { type LatLng, Polyline } from 'react-native-maps';";
        assert_eq!(symbols(source, "react-native-maps"), vec!["Polyline"]);
    }

    #[test]
    fn test_namespace_member_uses() {
        let source = "import * as Maps from 'react-native-maps';\n\
                      const a = <Maps.MapView />;\n\
                      Maps.Marker; other.Maps.Hidden;";
        assert_eq!(symbols(source, "react-native-maps"), vec!["MapView", "Marker"]);
    }

    #[test]
    fn test_side_effect_and_dynamic_imports_ignored() {
        let source = "import 'react-native-gesture-handler';\nconst m = import('react-native-maps');";
        assert!(extract_imports(source).is_empty());
    }

    #[test]
    fn test_require_forms() {
        let source = "const { codegenNativeCommands, Other: renamed, ...rest } = require('codegen');\n\
                      const Native = require('native');\n\
                      Native.UIManager.measure();\n\
                      const x = require('direct').Value;";

        assert_eq!(symbols(source, "codegen"), vec!["codegenNativeCommands", "Other"]);
        assert_eq!(symbols(source, "native"), vec!["UIManager"]);
        assert_eq!(symbols(source, "direct"), vec!["Value"]);
    }

    #[test]
    fn test_reexports_count_as_uses() {
        let source = "export { Marker as AppMarker, default } from 'react-native-maps';";
        assert_eq!(symbols(source, "react-native-maps"), vec!["Marker", "default"]);
    }

    #[test]
    fn test_use_spans_point_at_symbol() {
        let source = "import { Marker } from 'react-native-maps';";
        let uses = extract_imports(source);
        assert_eq!(&source[uses[0].span.clone()], "Marker");
    }
}
