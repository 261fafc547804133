//! End-to-end scenario driver for the meshtrace engine.
//!
//! Replays the probe sequences of representative mesh-path operations
//! against a live engine and checks the published events, without any
//! kernel or attachment mechanism.  Useful as a smoke test on hosts
//! where the probed stack is unavailable.
//!
//! Usage:
//!   cargo run --bin meshtrace-scenarios
//!   cargo run --bin meshtrace-scenarios -- --json

use clap::Parser;
use meshtrace_engine::probe::{IfaceView, PathView};
use meshtrace_engine::{ring, AddOutcome, EngineConfig, TraceEngine};
use meshtrace_protocol::{Action, IfaceName, MacAddr, PathEvent, HAS_QOS, HDR_SIZE_3ADDR};

#[derive(Parser)]
#[command(name = "meshtrace-scenarios")]
#[command(about = "Replay canned probe sequences against the meshtrace engine")]
#[command(version)]
struct Cli {
    /// Print every published event as JSON.
    #[arg(long)]
    json: bool,
}

struct Iface;

impl IfaceView for Iface {
    fn hw_addr(&self) -> MacAddr {
        MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01])
    }
    fn name(&self) -> IfaceName {
        IfaceName::new("mesh0")
    }
}

struct Path {
    dst: MacAddr,
    next_hop: Option<MacAddr>,
}

impl PathView for Path {
    fn dst(&self) -> MacAddr {
        self.dst
    }
    fn next_hop(&self) -> Option<MacAddr> {
        self.next_hop
    }
    fn iface_hw_addr(&self) -> MacAddr {
        Iface.hw_addr()
    }
    fn iface_name(&self) -> IfaceName {
        Iface.name()
    }
}

fn qos_data_frame() -> Vec<u8> {
    let mut buf = vec![0u8; 64];
    buf[..2].copy_from_slice(&HAS_QOS.to_le_bytes());
    buf[4..10].fill(0x11);
    buf[10..16].fill(0x22);
    buf[16..22].fill(0x33);
    buf[22..24].copy_from_slice(&0x0010u16.to_le_bytes());
    buf[HDR_SIZE_3ADDR..HDR_SIZE_3ADDR + 2].copy_from_slice(&0x0003u16.to_le_bytes());
    buf
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let dst = MacAddr([0xd0, 0xd1, 0xd2, 0xd3, 0xd4, 0xd5]);
    let nh_old = MacAddr([0x88; 6]);
    let nh_new = MacAddr([0x77; 6]);

    let (tx, rx) = ring::ring();
    let engine = TraceEngine::new(EngineConfig::default(), tx);

    let mut passed = 0usize;
    let mut failed = 0usize;

    let mut check = |name: &str, expect: &[Action]| {
        let events = rx.drain();
        let got: Vec<Action> = events.iter().map(|rec| rec.action).collect();
        let ok = got == expect && engine.scratch_is_empty();
        if ok {
            println!("  [pass] {name}: {got:?}");
            passed += 1;
        } else {
            println!("  [FAIL] {name}: expected {expect:?}, got {got:?}");
            failed += 1;
        }
        if cli.json {
            for rec in &events {
                let event = PathEvent::from_record(rec);
                println!("{}", serde_json::to_string(&event).expect("serialize event"));
            }
        }
    };

    println!("meshtrace scenario driver");

    // 1: add, then the path transmits a frame.
    engine.on_path_add_return(1, 1_000, &Iface, AddOutcome::Created { dst });
    engine.on_frame_transmit(1, &qos_data_frame());
    check("add → transmit", &[Action::TxAdd]);

    // 2: add with a next hop assigned in the same transaction.
    engine.on_path_add_return(2, 2_000, &Iface, AddOutcome::Created { dst });
    engine.on_nexthop_assign(2, 2_010, &Path { dst, next_hop: None }, nh_new);
    engine.on_mgmt_frame_receive(2, &qos_data_frame());
    check("add+assign → receive", &[Action::RxAddAssign]);

    // 3: standalone next-hop replacement from user space.
    engine.on_nexthop_assign(3, 3_000, &Path { dst, next_hop: Some(nh_old) }, nh_new);
    engine.on_userspace_return(3);
    check("change → user space", &[Action::UsChange]);

    // 4: expiration burst of three paths.
    engine.on_expire_enter(4);
    for i in 0..3u64 {
        engine.on_path_del_return(4, 4_000 + i, &Path { dst, next_hop: Some(nh_old) });
    }
    engine.on_expire_return(4);
    check(
        "expiration burst",
        &[Action::KernelExpire, Action::KernelExpire, Action::KernelExpire],
    );

    // 5: plain delete, origin resolved by the user-space probe.
    engine.on_path_del_return(5, 5_000, &Path { dst, next_hop: Some(nh_old) });
    engine.on_userspace_return(5);
    check("delete → user space", &[Action::UsDelete]);

    println!();
    println!("{passed} passed, {failed} failed, {} dropped", engine.dropped_events());
    if failed > 0 {
        std::process::exit(1);
    }
}
