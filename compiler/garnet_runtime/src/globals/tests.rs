#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Tests use unwrap for brevity"
)]

use garnet_value::{EvalErrorKind, Value};
use pretty_assertions::assert_eq;

use super::*;

fn read(table: &mut GlobalTable, name: &str) -> Value {
    match table.get(name) {
        GlobalRead::Value(value) => value,
        GlobalRead::Special(special) => panic!("unexpected special global {special:?}"),
    }
}

#[test]
fn unknown_global_reads_nil_and_becomes_defined() {
    let mut table = GlobalTable::new();
    assert_eq!(read(&mut table, "$x"), Value::Nil);
    assert!(table.is_defined("$x"));
}

#[test]
fn plain_global_round_trips() {
    let mut table = GlobalTable::new();
    assert!(matches!(table.set("$x", Value::int(3)), Ok(GlobalWrite::Stored)));
    assert_eq!(read(&mut table, "$x"), Value::int(3));
}

#[test]
fn read_only_global_rejects_writes() {
    let mut table = GlobalTable::new();
    table.define(GlobalVariable::read_only("$0", Value::string("main")));
    let err = table.set("$0", Value::string("other")).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::ReadOnlyGlobal {
            name: "$0".to_string()
        }
    );
    assert_eq!(read(&mut table, "$0"), Value::string("main"));
}

#[test]
fn alias_shares_storage_both_ways() {
    let mut table = GlobalTable::new();
    table.set("$old", Value::int(1)).unwrap();
    table.alias("$old", "$new");
    assert_eq!(read(&mut table, "$new"), Value::int(1));

    table.set("$new", Value::int(2)).unwrap();
    assert_eq!(read(&mut table, "$old"), Value::int(2));
    table.set("$old", Value::int(3)).unwrap();
    assert_eq!(read(&mut table, "$new"), Value::int(3));
}

#[test]
fn alias_of_missing_global_creates_it() {
    let mut table = GlobalTable::new();
    table.alias("$missing", "$other");
    assert!(table.is_defined("$missing"));
    assert_eq!(read(&mut table, "$other"), Value::Nil);
}

#[test]
fn alias_survives_undefining_the_original() {
    let mut table = GlobalTable::new();
    table.set("$old", Value::int(9)).unwrap();
    table.alias("$old", "$new");
    assert!(table.undefine("$old"));
    assert!(!table.is_defined("$old"));
    assert_eq!(read(&mut table, "$new"), Value::int(9));
}

#[test]
fn alias_of_read_only_stays_read_only() {
    let mut table = GlobalTable::new();
    table.define(GlobalVariable::read_only("$$", Value::int(42)));
    table.alias("$$", "$PID");
    assert!(table.set("$PID", Value::int(1)).is_err());
    assert!(table.lookup("$PID").is_some_and(|var| var.is_alias()));
}

#[test]
fn special_globals_defer_to_the_caller() {
    let mut table = GlobalTable::new();
    table.define(GlobalVariable::special("$SAFE", SpecialGlobal::SafeLevel));
    assert_eq!(table.get("$SAFE"), GlobalRead::Special(SpecialGlobal::SafeLevel));
    assert!(matches!(
        table.set("$SAFE", Value::int(1)),
        Ok(GlobalWrite::Special(SpecialGlobal::SafeLevel))
    ));
}

#[test]
fn names_are_sorted() {
    let mut table = GlobalTable::new();
    table.set("$b", Value::Nil).unwrap();
    table.set("$a", Value::Nil).unwrap();
    assert_eq!(table.names(), vec!["$a".to_string(), "$b".to_string()]);
    assert_eq!(table.len(), 2);
}

mod properties {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn last_write_wins(writes in proptest::collection::vec((0usize..4, any::<i64>()), 1..32)) {
            let names = ["$a", "$b", "$c", "$d"];
            let mut table = GlobalTable::new();
            let mut expected = [None; 4];
            for (slot, n) in writes {
                prop_assert!(table.set(names[slot], Value::int(n)).is_ok());
                expected[slot] = Some(n);
            }
            for (slot, n) in expected.iter().enumerate() {
                let want = n.map_or(Value::Nil, Value::int);
                prop_assert_eq!(read(&mut table, names[slot]), want);
            }
        }
    }
}
