use std::collections::HashMap;

/// Handle to a string interned in a [`StrPool`].
///
/// Two symbols from the same pool are equal iff their text is equal, so name
/// resolution never has to compare the underlying bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

/// Deduplicating string table.
///
/// Every distinct lexeme is stored once; `intern` hands back the same
/// `Symbol` for repeated text.
#[derive(Debug, Default)]
pub struct StrPool {
    strings: Vec<Box<str>>,
    lookup: HashMap<Box<str>, Symbol>,
}

impl StrPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(text) {
            return sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(text.into());
        self.lookup.insert(text.into(), sym);
        sym
    }

    /// Text of an interned symbol.
    ///
    /// Symbols are only ever produced by `intern` on this pool, so the index
    /// is always in range.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
