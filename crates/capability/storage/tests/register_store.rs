use gw_storage::{AddressError, Region, RegisterLayout, RegisterStore, encode_f32_pair};

fn store() -> RegisterStore {
    RegisterStore::new(RegisterLayout {
        holding_registers: 4,
        coils_read: 3,
        coils_write: 2,
    })
}

#[test]
fn float_pairs_round_trip_through_store() {
    let store = store();
    store.write_float_pair(0, 12.5).expect("write");
    store.write_float_pair(2, -3.25).expect("write");

    let [a0, a1] = encode_f32_pair(12.5);
    let [b0, b1] = encode_f32_pair(-3.25);
    assert_eq!(store.holding_snapshot(), vec![a0, a1, b0, b1]);
    assert_eq!(store.read_holding_pair(0).expect("pair"), (a0, a1));
    assert_eq!(store.read_float_pair(2).expect("float"), -3.25);
}

#[test]
fn pair_straddling_the_end_is_rejected_without_write() {
    let store = store();
    let err = store.write_float_pair(3, 1.0).expect_err("out of range");
    assert_eq!(
        err,
        AddressError {
            region: Region::HoldingRegisters,
            index: 4,
            len: 4,
        }
    );
    assert_eq!(store.holding_snapshot(), vec![0, 0, 0, 0]);
}

#[test]
fn coil_regions_are_independent() {
    let store = store();
    store.set_read_coil(2, true).expect("read coil");
    store.set_write_coil(1, true).expect("write coil");

    assert_eq!(store.read_coils_snapshot(), vec![false, false, true]);
    assert!(store.write_coil(1).expect("write coil"));
    assert!(!store.write_coil(0).expect("write coil"));
}

#[test]
fn out_of_range_coils_fail() {
    let store = store();
    let err = store.read_coil(3).expect_err("read coil");
    assert_eq!(err.region, Region::CoilsRead);
    assert!(store.set_write_coil(2, true).is_err());
    assert!(store.write_holding(9, 1).is_err());
    assert_eq!(
        err.to_string(),
        "invalid read coil address: index 3 outside 0..3"
    );
}
