use std::sync::Arc;
use std::thread;

use crate::pipe::MessagePipe;
use crate::sched::register_yield_hook;

#[test]
fn fifo_order() {
    let pipe = MessagePipe::new(8);
    assert!(pipe.send(1u32));
    assert!(pipe.send(2));
    assert!(pipe.send(3));
    assert_eq!(pipe.try_recv(), Some(1));
    assert_eq!(pipe.try_recv(), Some(2));
    assert_eq!(pipe.try_recv(), Some(3));
    assert_eq!(pipe.try_recv(), None);
}

#[test]
fn overflow_counts_drops() {
    let pipe = MessagePipe::new(2);
    assert!(pipe.send_from_isr(10u32) == false); // no receiver waiting
    pipe.send_from_isr(20);
    pipe.send_from_isr(30); // full: dropped
    assert_eq!(pipe.len(), 2);
    assert_eq!(pipe.drops(), 1);
    pipe.clear_drops();
    assert_eq!(pipe.drops(), 0);
}

#[test]
fn blocking_recv_wakes_on_send() {
    register_yield_hook(std::thread::yield_now);
    let pipe = Arc::new(MessagePipe::new(4));
    let rx = Arc::clone(&pipe);
    let consumer = thread::spawn(move || rx.recv());
    thread::sleep(std::time::Duration::from_millis(20));
    pipe.send_from_isr(0xdeadbeefu32);
    assert_eq!(consumer.join().unwrap(), 0xdeadbeef);
}
