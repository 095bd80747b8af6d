use std::{sync::Arc, thread, time::Duration};

#[cfg(feature = "serde")]
use codel_aqm::RegistryConfig;
use codel_aqm::{Clock, CoDelRegistry, Error, ManualClock, MonotonicClock, StdPacket, Timestamp};

use crate::{FREQUENCY, PACKET_SIZE};

#[cfg(feature = "serde")]
#[test_log::test]
fn test_registry_from_toml() -> Result<(), Error> {
    use std::io::Write;

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        r#"
[defaults]
target = "10ms"
interval = "200ms"

[interfaces.eth0]
limit = 32

[interfaces.eth1]
target = 2
interval = 50
ecn = true
"#
    )?;
    let config = RegistryConfig::from_file(file.path())?;
    let registry = CoDelRegistry::<StdPacket, _>::from_config(config, ManualClock::new(FREQUENCY))?;
    assert_eq!(registry.names(), vec!["eth0".to_string(), "eth1".to_string()]);

    let eth0 = registry.get_stats("eth0")?;
    assert_eq!(eth0.target, Duration::from_millis(10));
    assert_eq!(eth0.interval, Duration::from_millis(200));
    assert_eq!(eth0.queue_limit, 32);
    assert!(!eth0.ecn);

    let eth1 = registry.get_stats("eth1")?;
    assert_eq!(eth1.target, Duration::from_millis(2));
    assert_eq!(eth1.interval, Duration::from_millis(50));
    assert!(eth1.ecn);

    registry.enqueue("eth0", StdPacket::with_length(PACKET_SIZE))?;
    assert!(registry.dequeue("eth0")?.is_some());
    Ok(())
}

#[test_log::test]
fn test_interfaces_are_independent() {
    let clock = ManualClock::starting_at(Timestamp::from_ticks(10_000), FREQUENCY);
    let registry = Arc::new(CoDelRegistry::<StdPacket, _>::new(clock.clone()));
    let names = ["eth0", "eth1", "eth2", "eth3"];
    for name in names {
        registry.attach(name).unwrap();
        registry.enable(name).unwrap();
    }

    let handles: Vec<_> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let registry = registry.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    registry
                        .enqueue(name, StdPacket::with_length(100 * (i + 1)))
                        .unwrap();
                    assert!(registry.dequeue(name).unwrap().is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for (i, name) in names.iter().enumerate() {
        let stats = registry.get_stats(name).unwrap();
        assert_eq!(stats.queue_length, 0);
        assert_eq!(stats.stats.xmit.packets, 1000);
        assert_eq!(stats.stats.xmit.bytes, 1000 * 100 * (i as u64 + 1));
        assert_eq!(stats.stats.dropped.packets, 0);
    }
}

#[test_log::test]
fn test_report_lists_counters() -> Result<(), Error> {
    let registry = CoDelRegistry::<StdPacket, _>::new(ManualClock::new(FREQUENCY));
    registry.attach("eth0")?;
    registry.enable("eth0")?;
    registry.enqueue("eth0", StdPacket::with_length(PACKET_SIZE))?;
    registry.dequeue("eth0")?;

    let report = registry.get_stats("eth0")?.to_string();
    let lines: Vec<_> = report.lines().collect();
    assert!(lines[0].starts_with("eth0: codel target:5ms interval:100ms"));
    assert_eq!(lines[1], "     qlen:0 qlimit:1000");
    assert_eq!(lines[2], "     CoDel xmit:1 (maxpacket:1500 marked:0)");
    assert!(lines[3].starts_with("     dropped:0 pkts"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_monotonic_clock_sojourn() -> Result<(), Error> {
    let clock = MonotonicClock::new();
    let registry = CoDelRegistry::<StdPacket, _>::new(clock);
    registry.attach("lo")?;
    registry.enable("lo")?;
    registry.enqueue("lo", StdPacket::with_length(PACKET_SIZE))?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(registry.dequeue("lo")?.is_some());

    let sojourn = registry.interface("lo")?.lock().codel().vars().last_sojourn;
    let sojourn = clock.duration_from_ticks(sojourn);
    assert!(sojourn >= Duration::from_millis(200), "{sojourn:?}");
    assert!(sojourn < Duration::from_millis(210), "{sojourn:?}");
    Ok(())
}
