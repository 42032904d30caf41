use calamine::{Reader, open_workbook_auto};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use trimport_core::{Currency, DedupScope, Direction, Money, Transaction, TransactionDraft};
use trimport_ledger::{ExportFormat, Ledger, StoredTransaction, export_to_path, file_checksum};

fn deposit(day: u32, cents: i64) -> Transaction {
    let mut draft = TransactionDraft::new(
        NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
        "Einzahlung",
        "2023-03.pdf",
    );
    draft.amount = Some((Money::new(Decimal::new(cents, 2), Currency::eur()), Direction::In));
    draft.seal(DedupScope::PerDocument)
}

#[test]
fn test_ledger_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("trade_republic.db");

    {
        let mut ledger = Ledger::open(&db_path).unwrap();
        let doc = ledger.upsert_document("2023-03.pdf", "c0ffee").unwrap();
        let inserted = ledger
            .append(doc, &[deposit(1, 10000), deposit(2, 20000), deposit(3, 30000)])
            .unwrap();
        assert_eq!(inserted, 3);
    }

    let mut ledger = Ledger::open(&db_path).unwrap();
    assert_eq!(ledger.known_hashes().unwrap().len(), 3);
    let doc = ledger.upsert_document("2023-03.pdf", "c0ffee").unwrap();
    assert_eq!(ledger.append(doc, &[deposit(1, 10000)]).unwrap(), 0);
    assert_eq!(ledger.count().unwrap(), 3);
}

#[test]
fn test_export_honours_limit_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = Ledger::open(&dir.path().join("ledger.db")).unwrap();
    let doc = ledger.upsert_document("2023-03.pdf", "c0ffee").unwrap();
    ledger
        .append(doc, &[deposit(9, 900), deposit(1, 100), deposit(5, 500)])
        .unwrap();

    let rows = ledger.list(Some(2)).unwrap();
    let days: Vec<u32> = rows.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
    assert_eq!(days, vec![9, 1]);

    let out = dir.path().join("export.json");
    export_to_path(&rows, ExportFormat::Json, &out).unwrap();
    let back: Vec<StoredTransaction> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(back, rows);

    let csv_out = dir.path().join("export.csv");
    export_to_path(&ledger.list(None).unwrap(), ExportFormat::Csv, &csv_out).unwrap();
    let csv_text = fs::read_to_string(&csv_out).unwrap();
    assert_eq!(csv_text.lines().count(), 4);
    assert!(csv_text.lines().nth(1).unwrap().starts_with("2023-03-09,Einzahlung,,,,9.00,,EUR,"));
}

#[test]
fn test_file_checksum_is_content_based() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.pdf");
    let b = dir.path().join("b.pdf");
    fs::write(&a, b"%PDF-1.4 same bytes").unwrap();
    fs::write(&b, b"%PDF-1.4 same bytes").unwrap();

    let sum = file_checksum(&a).unwrap();
    assert_eq!(sum.len(), 64);
    assert_eq!(sum, file_checksum(&b).unwrap());

    fs::write(&b, b"%PDF-1.4 other bytes").unwrap();
    assert_ne!(sum, file_checksum(&b).unwrap());
    assert!(file_checksum(&dir.path().join("missing.pdf")).is_err());
}

#[test]
fn test_xlsx_export_reads_back_in_column_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = Ledger::open(&dir.path().join("ledger.db")).unwrap();
    let doc = ledger.upsert_document("2023-03.pdf", "c0ffee").unwrap();
    ledger.append(doc, &[deposit(1, 10050), deposit(2, 20000)]).unwrap();
    let rows = ledger.list(None).unwrap();

    let out = dir.path().join("export.xlsx");
    let format = ExportFormat::from_extension(&out).unwrap();
    export_to_path(&rows, format, &out).unwrap();

    let mut workbook = open_workbook_auto(&out).unwrap();
    let sheet = workbook.sheet_names().first().cloned().unwrap();
    let range = workbook.worksheet_range(&sheet).unwrap();
    let cells: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();

    assert_eq!(cells.len(), 3);
    assert_eq!(cells[0], trimport_ledger::export::COLUMNS.map(String::from).to_vec());
    assert_eq!(cells[1][0], "2023-03-01");
    assert_eq!(cells[1][1], "Einzahlung");
    assert_eq!(cells[1][2], "");
    assert_eq!(cells[1][5], "100.5");
    assert_eq!(cells[1][7], "EUR");
    assert_eq!(cells[1][9], "2023-03.pdf");
    assert_eq!(cells[1][10], rows[0].txn_hash);
    assert_eq!(cells[2][5], "200");
}
