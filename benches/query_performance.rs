use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kindex::index::{ExtractedSymbol, FileRecord, InheritanceEdge, InheritanceKind, SymbolKind};
use kindex::IndexDatabase;
use tempfile::TempDir;

fn class(name: String, line: u32, parent: &str) -> ExtractedSymbol {
    ExtractedSymbol {
        kind: SymbolKind::Class,
        name,
        start_line: line,
        end_line: line + 10,
        signature: None,
        visibility: None,
        parent: None,
        supertypes: vec![InheritanceEdge {
            parent_name: parent.to_string(),
            kind: InheritanceKind::Extends,
        }],
    }
}

fn method(name: String, line: u32, parent: usize) -> ExtractedSymbol {
    ExtractedSymbol {
        kind: SymbolKind::Function,
        name,
        start_line: line,
        end_line: line + 2,
        signature: Some("(id: String)".to_string()),
        visibility: None,
        parent: Some(parent),
        supertypes: Vec::new(),
    }
}

fn create_large_index(dir: &TempDir, files: usize) -> IndexDatabase {
    let db = IndexDatabase::new(dir.path().join("index.db")).unwrap();

    let records: Vec<FileRecord> = (0..files)
        .map(|i| FileRecord {
            path: format!("features/m{}/src/main/kotlin/Type{}.kt", i / 50, i),
            name: format!("Type{}.kt", i),
            extension: ".kt".to_string(),
            module: Some(format!("features.m{}", i / 50)),
            modified_at: 1.0,
        })
        .collect();
    db.upsert_files(&records).unwrap();

    for (i, record) in records.iter().enumerate() {
        let file = db.get_file_by_path(&record.path).unwrap().unwrap();
        let symbols = vec![
            class(format!("Type{}", i), 1, "BaseType"),
            method(format!("loadType{}", i), 3, 0),
            method(format!("saveType{}", i), 6, 0),
        ];
        db.replace_file_symbols(file.id, &symbols).unwrap();
    }
    db.rebuild_full_text().unwrap();

    db
}

fn benchmark_symbol_search(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = create_large_index(&dir, 5000);

    c.bench_function("search_symbols_like", |b| {
        b.iter(|| db.search_symbols(black_box("Type42"), None, 20).unwrap())
    });

    c.bench_function("search_symbols_fts", |b| {
        b.iter(|| db.search_symbols_fts(black_box("loadType42"), None, 20).unwrap())
    });

    c.bench_function("file_outline", |b| {
        b.iter(|| {
            db.file_outline(black_box("features/m10/src/main/kotlin/Type500.kt"))
                .unwrap()
        })
    });

    c.bench_function("implementations", |b| {
        b.iter(|| db.implementations(black_box("BaseType")).unwrap())
    });
}

criterion_group!(benches, benchmark_symbol_search);
criterion_main!(benches);
