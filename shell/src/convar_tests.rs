use crate::convar::CellKind;
use crate::testutil::{env, rig, run};

// Cells the tests bind. Statics, so their addresses are stable.
static mut TEST_U32: u32 = 42;
static mut TEST_I16: i16 = -7;
static mut TEST_F32: f32 = 1.5;
static mut TEST_ARR: [u8; 4] = [10, 20, 30, 40];

#[test]
fn var_display_and_assign() {
    let r = rig();
    let mut e = env(&r);
    unsafe {
        r.sh.convars
            .add_scalar("counter", core::ptr::addr_of!(TEST_U32) as usize, 4, CellKind::Unsigned);
        r.sh.convars
            .add_scalar("offset", core::ptr::addr_of!(TEST_I16) as usize, 2, CellKind::Signed);
        r.sh.convars
            .add_scalar("ratio", core::ptr::addr_of!(TEST_F32) as usize, 4, CellKind::Float);
        r.sh.convars
            .add_array("buf", core::ptr::addr_of!(TEST_ARR) as usize, 1, 4, CellKind::Unsigned);
    }

    let out = run(&r, &mut e, "var counter");
    assert!(out.contains("counter = 42"), "got: {out}");

    // Assignment in every radix.
    let _ = run(&r, &mut e, "var counter 0x10");
    assert!(run(&r, &mut e, "var counter").contains("= 16"));
    let _ = run(&r, &mut e, "var counter 0b101");
    assert!(run(&r, &mut e, "var counter").contains("= 5"));
    let _ = run(&r, &mut e, "var counter 017");
    assert!(run(&r, &mut e, "var counter").contains("= 15"));

    // Unsigned rejects negatives.
    let out = run(&r, &mut e, "var counter -1");
    assert!(out.contains("unsigned"), "got: {out}");

    // Signed accepts them.
    let _ = run(&r, &mut e, "var offset -100");
    assert!(run(&r, &mut e, "var offset").contains("= -100"));

    // Floats need a decimal point.
    let out = run(&r, &mut e, "var ratio 2");
    assert!(out.contains("decimal point"), "got: {out}");
    let _ = run(&r, &mut e, "var ratio 2.25");
    assert!(run(&r, &mut e, "var ratio").contains("2.25"));

    // Array element access with bounds checking.
    let out = run(&r, &mut e, "var buf[2]");
    assert!(out.contains("buf[2] = 30"), "got: {out}");
    let _ = run(&r, &mut e, "var buf[2] 99");
    assert!(run(&r, &mut e, "var buf[2]").contains("= 99"));
    let out = run(&r, &mut e, "var buf[9]");
    assert!(out.contains("beyond the array range"), "got: {out}");

    // Range checking against the cell width.
    let out = run(&r, &mut e, "var buf[0] 300");
    assert!(out.contains("does not fit"), "got: {out}");

    // Prefix lookup: unique prefixes work, ambiguous ones are refused.
    assert!(run(&r, &mut e, "var cou").contains("counter ="));
    unsafe {
        r.sh.convars
            .add_scalar("count2", core::ptr::addr_of!(TEST_U32) as usize, 4, CellKind::Unsigned);
    }
    let out = run(&r, &mut e, "var cou");
    assert!(out.contains("Ambiguity"), "got: {out}");

    // Number display mode.
    let out = run(&r, &mut e, "var 0x10");
    assert!(out.contains("decimal 16"), "got: {out}");

    // The bare "var" table lists an array as its address, pointer-typed,
    // never as a dereferenced value.
    let out = run(&r, &mut e, "var");
    let addr = unsafe { core::ptr::addr_of!(TEST_ARR) as usize };
    assert!(out.contains("unsigned char *"), "got: {out}");
    assert!(
        out.contains(&std::format!("0x{addr:x}")),
        "array address missing: {out}"
    );
}
