#[cfg(test)]
mod tests {
    use leaktrace::symbols::{
        Symbols,
        dlsym::{DlSymSymbols, DlSymSymbolsError, LookupTypeDefault, LookupTypeNext},
    };

    #[test]
    fn test_lookup_malloc_next() {
        let addr = DlSymSymbols::<LookupTypeNext>::lookup(c"malloc").unwrap();
        assert_ne!(addr, 0);
    }

    #[test]
    fn test_lookup_write_default() {
        let addr = DlSymSymbols::<LookupTypeDefault>::lookup(c"write").unwrap();
        assert_ne!(addr, 0);
    }

    #[test]
    fn test_lookup_missing_symbol() {
        let err = DlSymSymbols::<LookupTypeNext>::lookup(c"leaktrace_no_such_symbol").unwrap_err();
        assert_eq!(
            err,
            DlSymSymbolsError::SymbolNotFound(c"leaktrace_no_such_symbol")
        );
    }
}
