use espshell_drivers::RmtSymbol;
use espshell_drivers::sim::TxMode;

use crate::testutil::{env, rig, run};

#[test]
fn short_form_packs_two_bits_per_symbol() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 0");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "zero 0/50");
    let _ = run(&r, &mut e, "one 1/50");
    let _ = run(&r, &mut e, "bits 1010");

    let seq = r.sh.sequences.get(0).unwrap().lock();
    assert!(seq.is_ready());
    assert_eq!(
        seq.compiled(),
        &[
            RmtSymbol::pulse(true, 50, false, 50),
            RmtSymbol::pulse(true, 50, false, 50),
        ]
    );
    assert_eq!(seq.tick_freq(), 1_000_000);
}

#[test]
fn odd_bit_count_pads_and_informs() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 1");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "zero 0/10");
    let _ = run(&r, &mut e, "one 1/10");
    let out = run(&r, &mut e, "bits 101");
    assert!(out.contains("padded"), "got: {out}");

    let seq = r.sh.sequences.get(1).unwrap().lock();
    assert_eq!(seq.bits(), Some("1011"));
    assert_eq!(seq.compiled().len(), 2);
}

#[test]
fn long_form_one_symbol_per_bit_with_framing() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 2");
    let _ = run(&r, &mut e, "tick 0.5");
    let _ = run(&r, &mut e, "zero 1/3 0/9");
    let _ = run(&r, &mut e, "one 1/9 0/3");
    let _ = run(&r, &mut e, "head 1/20 0/10");
    let _ = run(&r, &mut e, "tail 0/20 1/10");
    let _ = run(&r, &mut e, "bits 10");

    let seq = r.sh.sequences.get(2).unwrap().lock();
    assert_eq!(seq.compiled().len(), 4); // head + 2 bits + tail
    assert_eq!(seq.compiled()[0], RmtSymbol::pulse(true, 20, false, 10));
    assert_eq!(seq.compiled()[1], RmtSymbol::pulse(true, 9, false, 3));
    assert_eq!(seq.compiled()[2], RmtSymbol::pulse(true, 3, false, 9));
    assert_eq!(seq.compiled()[3], RmtSymbol::pulse(false, 20, true, 10));
}

#[test]
fn mixed_alphabet_is_refused() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 3");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "zero 0/50");
    let _ = run(&r, &mut e, "bits 10");
    let out = run(&r, &mut e, "one 1/30 0/70");
    // zero is a level, one is a pulse: reported once compilation is tried.
    assert!(out.contains("pulse"), "got: {out}");
    let seq = r.sh.sequences.get(3).unwrap().lock();
    assert!(!seq.is_ready());
}

#[test]
fn compile_is_idempotent() {
    // Property 9: compiling twice yields the identical array.
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 4");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "zero 0/50");
    let _ = run(&r, &mut e, "one 1/50");
    let _ = run(&r, &mut e, "bits 110");

    let first = r.sh.sequences.get(4).unwrap().lock().compiled().to_vec();
    {
        let mut seq = r.sh.sequences.get(4).unwrap().lock();
        let _ = seq.compile();
    }
    let second = r.sh.sequences.get(4).unwrap().lock().compiled().to_vec();
    assert_eq!(first, second);
}

#[test]
fn levels_input_compiles_directly() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 5");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "levels 1/50 0/50 1/100");
    let seq = r.sh.sequences.get(5).unwrap().lock();
    assert!(seq.is_ready());
    assert_eq!(seq.compiled().len(), 2);
    assert_eq!(seq.compiled()[0], RmtSymbol::pulse(true, 50, false, 50));
    assert_eq!(seq.compiled()[1], RmtSymbol::level(true, 100));
}

#[test]
fn mutation_invalidates_compiled_array() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 6");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "zero 0/50");
    let _ = run(&r, &mut e, "one 1/50");
    let _ = run(&r, &mut e, "bits 10");
    assert_eq!(r.sh.sequences.get(6).unwrap().lock().compiled().len(), 1);
    // Changing the alphabet recompiles with the new symbol.
    let _ = run(&r, &mut e, "zero 0/80");
    let seq = r.sh.sequences.get(6).unwrap().lock();
    assert_eq!(seq.compiled()[0].duration1, 80);
}

#[test]
fn tick_range_is_enforced() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 7");
    let out = run(&r, &mut e, "tick 5.0");
    assert!(out.contains("Tick must be within"), "got: {out}");
    let out = run(&r, &mut e, "tick 0.001");
    assert!(out.contains("Tick must be within"), "got: {out}");
}

#[test]
fn pin_sequence_transmits_via_rmt() {
    // Scenario S3: configure, then send over a pin.
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 0");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "zero 0/50");
    let _ = run(&r, &mut e, "one 1/50");
    let _ = run(&r, &mut e, "bits 1010");
    let _ = run(&r, &mut e, "exit");
    let out = run(&r, &mut e, "pin 4 sequence 0");
    assert!(!out.contains("error"), "got: {out}");

    let txs = r.rmt.transmissions();
    assert_eq!(txs.len(), 1);
    let tx = &txs[0];
    assert_eq!(tx.pin, 4);
    assert_eq!(tx.tick_hz, 1_000_000);
    assert_eq!(tx.mode, TxMode::Once);
    assert!(!tx.eot_high);
    // H-L-H-L at 50 ticks each, packed two levels per symbol.
    assert_eq!(tx.symbols.len(), 2);
    assert_eq!(tx.symbols[0], RmtSymbol::pulse(true, 50, false, 50));
}

#[test]
fn loop_count_selects_write_mode() {
    let r = rig();
    let mut e = env(&r);
    let _ = run(&r, &mut e, "sequence 8");
    let _ = run(&r, &mut e, "tick 1");
    let _ = run(&r, &mut e, "levels 1/10 0/10");
    let _ = run(&r, &mut e, "loop 5");
    let _ = run(&r, &mut e, "exit");
    let _ = run(&r, &mut e, "pin 2 sequence 8");

    let _ = run(&r, &mut e, "sequence 8");
    let _ = run(&r, &mut e, "loop infinite");
    let _ = run(&r, &mut e, "exit");
    let _ = run(&r, &mut e, "pin 2 sequence 8");

    let txs = r.rmt.transmissions();
    assert_eq!(txs[txs.len() - 2].mode, TxMode::Repeated(5));
    assert_eq!(txs[txs.len() - 1].mode, TxMode::Looping);
}
