//! # unitgraph
//!
//! Tokenizer and unit dependency analysis for Pascal-family sources.
//!
//! unitgraph scans raw source bytes into a position-tracked token stream and
//! builds, from that stream, the graph of which units use which: split by
//! interface and implementation section, following `{$I}` include files.
//!
//! ## Key Features
//!
//! - **Scanner**: byte-exact tokens with line/column positions, error recovery
//! - **Dependency index**: transitive uses from a set of project files
//! - **Cycles**: interface-level circular uses via strongly connected components
//! - **Why**: every chain of dependents that pulls a unit into a project
//! - **Reports**: text, DOT, TGF and plain edge lists
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use unitgraph::{build_index, UnitGraphConfig, UsesGraph};
//! use std::path::Path;
//!
//! let config = UnitGraphConfig::default();
//! let index = build_index(&config, &["Project.dpr"], Some(Path::new("src")), &[])?;
//!
//! let graph = UsesGraph::from_index(&index);
//! for cycle in graph.find_cycles() {
//!     println!("{}", cycle.join(", "));
//! }
//! # Ok::<(), unitgraph::UnitGraphError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod scanner;
pub mod token;

// Re-exports for convenience
pub use config::UnitGraphConfig;
pub use error::{Result, UnitGraphError};

pub use graph::{
    build_index, format_path, search_path_from_root, DependencyIndex, EdgeKind, Section,
    UnitUses, UsesGraph,
};
pub use scanner::{quote, scan, tokenize_files, Mode, Scanner};
pub use token::{File, FileSet, Pos, Position, Token};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::ops::ControlFlow;
    use tempfile::TempDir;

    #[test]
    fn test_scan_unit_header() {
        let source = "unit Utils;\n\ninterface\n\nuses\n  SysUtils, Classes;\n";
        let mut toks = Vec::new();
        scan(
            source.as_bytes(),
            Mode::empty(),
            |tok, lit| {
                toks.push((tok, lit.to_string()));
                ControlFlow::Continue(())
            },
            None,
        )
        .unwrap();

        let kinds: Vec<Token> = toks.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Unit,
                Token::Ident,
                Token::Semicolon,
                Token::Interface,
                Token::Uses,
                Token::Ident,
                Token::Comma,
                Token::Ident,
                Token::Semicolon,
                Token::Eof,
            ]
        );
        assert_eq!(toks[5].1, "SysUtils");
    }

    #[test]
    fn test_end_to_end_project() {
        let dir = TempDir::new().unwrap();
        let files = [
            ("Shop.dpr", "program Shop;\nuses\n  Orders in 'Orders.pas',\n  Stock;\nbegin\nend."),
            (
                "Orders.pas",
                "unit Orders;\ninterface\nuses Stock;\nimplementation\nuses Billing;\nend.",
            ),
            ("Stock.pas", "unit Stock;\ninterface\nuses Orders;\nimplementation\nend."),
            ("Billing.pas", "unit Billing;\n{ uses Stock; in a comment }\ninterface\nend."),
        ];
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }

        let config = UnitGraphConfig::default();
        let index = build_index(&config, &["Shop.dpr"], Some(dir.path()), &[]).unwrap();
        assert_eq!(index.uses().len(), 4);
        assert!(index.get("billing").unwrap().is_empty());

        let graph = UsesGraph::from_index(&index);
        let mut cycle = graph.find_cycles().pop().unwrap();
        cycle.sort();
        assert_eq!(cycle, vec!["Orders", "Stock"]);

        let why: Vec<String> = graph.why("Billing").iter().map(|p| format_path(p)).collect();
        assert_eq!(why, vec![">Shop>Orders>Billing", ">Shop>Stock>Orders>Billing"]);
    }
}
