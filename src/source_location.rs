use crate::error::EncodeError;
use crate::field::{Field, MarshalObject, ObjectEncoder};

/// Key of the source code location associated with an entry.
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";

/// Maps a program counter to the fully-qualified name of its function.
pub trait SymbolResolver {
    /// `None` when the address cannot be resolved; that is not an error.
    fn resolve(&self, pc: usize) -> Option<String>;
}

impl<F> SymbolResolver for F
where
    F: Fn(usize) -> Option<String>,
{
    fn resolve(&self, pc: usize) -> Option<String> {
        self(pc)
    }
}

/// Resolver that never knows any symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn resolve(&self, _pc: usize) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: i64,
    pub function: String,
}

impl SourceLocation {
    /// `None` when `ok` is false, i.e. the caller could not be determined.
    pub fn new(
        pc: usize,
        file: impl Into<String>,
        line: i64,
        ok: bool,
        resolver: &dyn SymbolResolver,
    ) -> Option<Self> {
        if !ok {
            return None;
        }
        Some(SourceLocation {
            file: file.into(),
            line,
            function: resolver.resolve(pc).unwrap_or_default(),
        })
    }

    /// Location of a `tracing` call site. The module path stands in for
    /// the function name.
    pub fn from_metadata(meta: &tracing::Metadata<'_>) -> Option<Self> {
        let file = meta.file()?;
        Some(SourceLocation {
            file: file.to_string(),
            line: meta.line().map(i64::from).unwrap_or_default(),
            function: meta.module_path().unwrap_or_default().to_string(),
        })
    }
}

impl MarshalObject for SourceLocation {
    fn marshal(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError> {
        enc.add_str("file", &self.file);
        enc.add_i64("line", self.line);
        enc.add_str("function", &self.function);
        Ok(())
    }
}

/// Source location field; skipped entirely when `ok` is false.
pub fn source_location(pc: usize, file: impl Into<String>, line: i64, ok: bool, resolver: &dyn SymbolResolver) -> Field {
    source_location_field(SourceLocation::new(pc, file, line, ok, resolver))
}

pub fn source_location_field(location: Option<SourceLocation>) -> Field {
    match location {
        Some(loc) => Field::object(SOURCE_LOCATION_KEY, loc),
        None => Field::skip(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::MapObjectEncoder;
    use serde_json::json;

    fn encode(field: Field) -> serde_json::Value {
        let mut enc = MapObjectEncoder::new();
        field.add_to(&mut enc).unwrap();
        enc.into_value()
    }

    #[test]
    fn not_ok_omits_field() {
        assert_eq!(encode(source_location(0x10, "main.rs", 3, false, &NoSymbols)), json!({}));
    }

    #[test]
    fn unresolved_pc_keeps_file_and_line() {
        assert_eq!(
            encode(source_location(0x10, "src/main.rs", 3, true, &NoSymbols)),
            json!({SOURCE_LOCATION_KEY: {"file": "src/main.rs", "line": 3, "function": ""}})
        );
    }

    #[test]
    fn resolved_pc() {
        let resolver = |pc: usize| (pc == 0x42).then(|| "app::handler::serve".to_string());
        let v = encode(source_location(0x42, "src/handler.rs", 88, true, &resolver));
        assert_eq!(v[SOURCE_LOCATION_KEY]["function"], "app::handler::serve");
    }
}
