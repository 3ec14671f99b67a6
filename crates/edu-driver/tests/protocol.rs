//! Command/interrupt protocol tests
//!
//! A second thread plays the interrupt line against the simulated device: it
//! waits until the device is armed, completes the operation and calls the
//! demultiplexer, the way the platform's interrupt callback would.

use edu_driver::chip::regs::{self, irq, status};
use edu_driver::{
    Access, Controller, ControllerConfig, DispatchMode, DmaDirection, EduError, SimulatedDevice,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const ARM_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn setup(config: ControllerConfig) -> (Arc<SimulatedDevice>, Arc<Controller<Arc<SimulatedDevice>>>) {
    init_tracing();
    let dev = Arc::new(SimulatedDevice::new());
    let ctrl = Arc::new(Controller::new(Arc::clone(&dev), config));
    (dev, ctrl)
}

/// Interrupt thread: wait for the device to be armed, let `finish` complete
/// the work, then service the interrupt.
fn interrupt_line(
    dev: &Arc<SimulatedDevice>,
    ctrl: &Arc<Controller<Arc<SimulatedDevice>>>,
    finish: impl FnOnce(&SimulatedDevice) + Send + 'static,
) -> JoinHandle<edu_driver::InterruptReport> {
    let dev = Arc::clone(dev);
    let ctrl = Arc::clone(ctrl);
    thread::spawn(move || {
        assert!(dev.wait_until_armed(ARM_TIMEOUT), "device never armed");
        finish(dev.as_ref());
        ctrl.handle_interrupt()
    })
}

#[test]
fn factorial_of_five_returns_120_and_acks_factorial_bit() {
    let (dev, ctrl) = setup(ControllerConfig::default());

    let line = interrupt_line(&dev, &ctrl, |d| {
        assert!(d.complete_factorial());
    });

    assert_eq!(ctrl.compute_factorial(5).unwrap(), 120);

    let report = line.join().unwrap();
    assert_eq!(report.status, irq::FACTORIAL);
    assert!(report.factorial_signaled);
    assert_eq!(dev.writes_to(regs::IRQ_ACK), vec![u64::from(irq::FACTORIAL)]);
}

#[test]
fn factorial_writes_operand_then_barrier_then_arm_before_reading_result() {
    let (dev, ctrl) = setup(ControllerConfig::default());

    // The harness injects the result directly instead of computing it
    let line = interrupt_line(&dev, &ctrl, |d| {
        d.set_factorial(120);
        d.set_irq_status(irq::FACTORIAL);
    });
    assert_eq!(ctrl.compute_factorial(5).unwrap(), 120);
    line.join().unwrap();

    let log = dev.take_log();
    let pos = |pred: &dyn Fn(&Access) -> bool| log.iter().position(|a| pred(a)).unwrap();

    let operand = pos(&|a| *a == Access::Write32 { offset: regs::FACTORIAL, value: 5 });
    let barrier = pos(&|a| *a == Access::Barrier);
    let arm = pos(&|a| {
        *a == Access::Write32 {
            offset: regs::STATUS,
            value: status::RAISE_IRQ,
        }
    });
    let result = pos(&|a| a.is_read_of(regs::FACTORIAL));

    assert!(operand < barrier, "{log:?}");
    assert!(barrier < arm, "{log:?}");
    assert!(arm < result, "{log:?}");

    // Nothing between arming and the interrupt's status read comes from the
    // command side: the caller was blocked
    let irq_read = pos(&|a| a.is_read_of(regs::IRQ_STATUS));
    assert!(arm < irq_read && irq_read < result, "{log:?}");
    assert!(log[arm + 1..irq_read].is_empty(), "{log:?}");
}

#[test]
fn sequential_commands_are_independent() {
    let (dev, ctrl) = setup(ControllerConfig::default());

    for (n, expected) in [(5, 120), (0, 1), (10, 3_628_800), (1, 1), (12, 479_001_600)] {
        let line = interrupt_line(&dev, &ctrl, |d| {
            d.complete_factorial();
        });
        assert_eq!(ctrl.compute_factorial(n).unwrap(), expected, "{n}!");
        line.join().unwrap();
    }
    assert_eq!(dev.irq_status(), 0);
}

#[test]
fn overlapping_command_is_rejected_as_busy() {
    let (dev, ctrl) = setup(ControllerConfig::default());

    let first = {
        let ctrl = Arc::clone(&ctrl);
        thread::spawn(move || ctrl.compute_factorial(6))
    };
    assert!(dev.wait_until_armed(ARM_TIMEOUT));

    let err = ctrl.compute_factorial(7).unwrap_err();
    assert!(matches!(err, EduError::Busy { .. }), "{err}");

    dev.complete_factorial();
    ctrl.handle_interrupt();
    assert_eq!(first.join().unwrap().unwrap(), 720);

    // No operand from the rejected call reached the device
    assert_eq!(dev.writes_to(regs::FACTORIAL), vec![6]);
}

#[test]
fn silent_device_times_out_and_controller_recovers() {
    let (dev, ctrl) = setup(ControllerConfig::default().with_timeout(Some(Duration::from_millis(30))));

    let err = ctrl.compute_factorial(3).unwrap_err();
    assert!(matches!(err, EduError::Timeout { duration_ms: 30 }), "{err}");

    // The late completion finds no waiter
    dev.complete_factorial();
    let late = ctrl.handle_interrupt();
    assert!(!late.factorial_signaled);

    let line = interrupt_line(&dev, &ctrl, |d| {
        d.complete_factorial();
    });
    assert_eq!(ctrl.compute_factorial(4).unwrap(), 24);
    line.join().unwrap();
}

#[test]
fn command_after_timeout_never_returns_the_stale_result() {
    let (dev, ctrl) = setup(ControllerConfig::default().with_timeout(Some(Duration::from_millis(20))));

    let err = ctrl.compute_factorial(3).unwrap_err();
    assert!(matches!(err, EduError::Timeout { .. }), "{err}");

    // The device is still working on 3! when the next call comes in
    let err = ctrl.compute_factorial(4).unwrap_err();
    assert!(matches!(err, EduError::Busy { command: "factorial" }), "{err}");
    assert_eq!(dev.writes_to(regs::FACTORIAL), vec![3]);

    // The late completion finds nobody waiting
    dev.complete_factorial();
    let late = ctrl.handle_interrupt();
    assert!(!late.factorial_signaled);

    let line = interrupt_line(&dev, &ctrl, |d| {
        d.complete_factorial();
    });
    assert_eq!(ctrl.compute_factorial(4).unwrap(), 24);
    line.join().unwrap();
}

#[test]
fn maximal_timeout_behaves_like_no_timeout() {
    let (dev, ctrl) = setup(ControllerConfig::default().with_timeout(Some(Duration::MAX)));

    let line = interrupt_line(&dev, &ctrl, |d| {
        d.complete_factorial();
    });
    assert_eq!(ctrl.compute_factorial(6).unwrap(), 720);
    line.join().unwrap();
}

#[test]
fn exact_match_drops_combined_status() {
    let (dev, ctrl) = setup(
        ControllerConfig::default()
            .with_dispatch(DispatchMode::ExactMatch)
            .with_timeout(Some(Duration::from_millis(50))),
    );

    let line = interrupt_line(&dev, &ctrl, |d| {
        d.complete_factorial();
        d.set_irq_status(irq::FACTORIAL | irq::DMA);
    });

    // Neither channel is signalled, so the caller never wakes
    let err = ctrl.compute_factorial(5).unwrap_err();
    assert!(matches!(err, EduError::Timeout { .. }));

    let report = line.join().unwrap();
    assert_eq!(report.status, 0x101);
    assert!(!report.factorial_signaled);
    assert!(!report.dma_signaled);
    assert!(report.is_malformed());
    assert_eq!(dev.writes_to(regs::IRQ_ACK), vec![0x101]);
}

#[test]
fn per_bit_dispatch_completes_combined_status() {
    let (dev, ctrl) = setup(ControllerConfig::default());

    let line = interrupt_line(&dev, &ctrl, |d| {
        d.complete_factorial();
        d.set_irq_status(irq::FACTORIAL | irq::DMA);
    });

    assert_eq!(ctrl.compute_factorial(5).unwrap(), 120);

    let report = line.join().unwrap();
    assert!(report.factorial_signaled);
    // No transfer was outstanding, so the DMA bit is spurious but still acked
    assert!(!report.dma_signaled);
    assert!(!report.is_malformed());
    assert_eq!(dev.writes_to(regs::IRQ_ACK), vec![0x101]);
}

#[test]
fn dma_transfer_completes_through_its_own_channel() {
    let (dev, ctrl) = setup(ControllerConfig::default());

    let line = interrupt_line(&dev, &ctrl, |d| {
        assert!(d.complete_dma());
    });

    ctrl.transfer_dma(0x10_0000, edu_driver::chip::dma::BUFFER_OFFSET, 64, DmaDirection::ToDevice)
        .unwrap();

    let report = line.join().unwrap();
    assert_eq!(report.status, irq::DMA);
    assert!(report.dma_signaled);
    assert!(!ctrl.is_transfer_active());
    assert_eq!(
        dev.writes_to(regs::DMA_CMD),
        vec![edu_driver::chip::dma::XFER_TO_DEVICE]
    );
}

#[test]
fn liveness_probe_is_one_write_one_read() {
    let (dev, ctrl) = setup(ControllerConfig::default());
    let echoed = ctrl.probe_liveness(0xa5a5_0000);
    assert_eq!(echoed, !0xa5a5_0000);

    assert_eq!(
        dev.take_log(),
        vec![
            Access::Write32 { offset: regs::LIVENESS, value: 0xa5a5_0000 },
            Access::Barrier,
            Access::Read32 { offset: regs::LIVENESS, value: echoed },
        ]
    );
}

#[test]
fn version_decodes_identity_register() {
    init_tracing();
    for (ident, major, minor) in [(0x0102_0304_u32, 0x01, 0x02), (0xFF00_AA00, 0xFF, 0x00)] {
        let ctrl = Controller::new(SimulatedDevice::with_ident(ident), ControllerConfig::default());
        let v = ctrl.read_version();
        assert_eq!((v.major, v.minor), (major, minor));
    }
}

#[test]
#[ignore] // Requires hardware (QEMU with -device edu)
fn test_probes_on_hardware() {
    let pcie_address = std::env::var("EDU_PCIE_ADDRESS").unwrap_or_else(|_| "0000:00:04.0".into());
    let bar = edu_driver::MappedRegion::for_device(&pcie_address).expect("map edu BAR0");
    let ctrl = Controller::new(bar, ControllerConfig::from_env());

    println!("edu version {}", ctrl.read_version());
    assert_eq!(ctrl.probe_liveness(0x1234_5678), !0x1234_5678);
}
