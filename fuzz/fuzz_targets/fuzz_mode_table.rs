//! Fuzz target: `ModeTable::from_remote`
//!
//! Arbitrary mode lists must build a table where every alias maps back to
//! its own mode and no alias belongs to two modes.
//!
//! cargo fuzz run fuzz_mode_table

#![no_main]

use flrig_link::rpc::ModeTable;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let list = String::from_utf8_lossy(data);
    let table = ModeTable::from_remote(&list);

    for mode in table.modes() {
        for alias in table.aliases(mode) {
            assert_eq!(table.canonical(alias), Some(mode));
        }
    }
});
