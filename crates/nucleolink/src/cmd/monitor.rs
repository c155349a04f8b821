use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nucleolink_frame::{Status, HEARTBEAT};
use nucleolink_session::{DeviceInfo, InitConfig, SensorConfig, Session};
use nucleolink_transport::{SerialConfig, SerialTransport, Transport};
use tracing::{info, warn};

use crate::cmd::MonitorArgs;
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_device, print_readings, OutputFormat, Reading};

/// Loop parameters shared by the initial bring-up and every reconnect.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub init: InitConfig,
    pub sensors: Vec<SensorConfig>,
    pub count: Option<u64>,
    pub period: Duration,
}

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    if let Some(sensor) = args.sensors.iter().find(|sensor| sensor.is_reserved()) {
        return Err(CliError::new(
            USAGE,
            format!("sensor id {:#04x} is reserved", sensor.id),
        ));
    }

    let config = args.link.session_config()?;
    let serial = SerialConfig {
        baud_rate: config.baud_rate,
        ..args.link.serial_config()
    };
    let mut session = Session::new(SerialTransport::new(serial), config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let options = MonitorOptions {
        init: args.link.init_config(),
        sensors: args.sensors,
        count: args.count,
        period: args.period,
    };

    let Some(device) = establish(&mut session, &options, &running)? else {
        return Ok(SUCCESS);
    };
    print_device(&device, session.transport().device(), format);

    let iterations = monitor_loop(&mut session, &options, &running, |readings| {
        print_readings(readings, format)
    })?;
    info!(iterations, "monitor stopped");

    Ok(SUCCESS)
}

/// Connect, handshake and register sensors, retrying until it works.
///
/// Returns `None` when interrupted. A version mismatch is not retried.
pub fn establish<T: Transport>(
    session: &mut Session<T>,
    options: &MonitorOptions,
    running: &AtomicBool,
) -> CliResult<Option<DeviceInfo>> {
    let mut attempt = 0u64;
    while running.load(Ordering::SeqCst) {
        attempt += 1;
        if let Err(err) = session.connect() {
            warn!(error = %err, attempt, "connect failed, retrying");
            thread::sleep(options.init.retry_delay);
            continue;
        }

        let device = match session.handshake(&options.init) {
            Ok(device) => device,
            Err(err) if is_version_mismatch(err.status()) => {
                return Err(session_error("init failed", err));
            }
            Err(err) => {
                warn!(error = %err, attempt, "init failed, retrying");
                thread::sleep(options.init.retry_delay);
                continue;
            }
        };

        match register_sensors(session, &options.sensors) {
            Ok(()) => {
                info!(attempt, sensors = options.sensors.len(), "device ready");
                return Ok(Some(device));
            }
            Err(err) => {
                warn!(error = %err, attempt, "sensor registration failed, retrying");
                session.disconnect();
            }
        }
    }
    Ok(None)
}

/// Poll and print until `count` iterations are done or `running` clears.
/// A lost link is re-established in place. Returns the iteration count.
pub fn monitor_loop<T: Transport>(
    session: &mut Session<T>,
    options: &MonitorOptions,
    running: &AtomicBool,
    mut emit: impl FnMut(&[Reading]),
) -> CliResult<u64> {
    let mut iteration = 0u64;
    while running.load(Ordering::SeqCst) {
        if options.count.is_some_and(|count| iteration >= count) {
            break;
        }

        if !session.is_connected() {
            warn!("link lost, reconnecting");
            if establish(session, options, running)?.is_none() {
                break;
            }
        }

        if let Err(err) = session.poll() {
            warn!(error = %err, "poll failed");
            session.disconnect();
            continue;
        }

        let mut readings = Vec::with_capacity(options.sensors.len() + 1);
        readings.push(Reading {
            iteration,
            label: "heartbeat".to_string(),
            key: HEARTBEAT,
            entry: session.fetch_heartbeat(),
        });
        for sensor in &options.sensors {
            readings.push(Reading {
                iteration,
                label: format!("sensor {}", sensor.id),
                key: sensor.id,
                entry: session.fetch_sensor(sensor.id),
            });
        }
        emit(&readings);

        iteration += 1;
        if !options.period.is_zero() {
            thread::sleep(options.period);
        }
    }
    Ok(iteration)
}

fn register_sensors<T: Transport>(
    session: &mut Session<T>,
    sensors: &[SensorConfig],
) -> nucleolink_session::Result<()> {
    for sensor in sensors {
        session.register_sensor(sensor)?;
    }
    Ok(())
}

fn is_version_mismatch(status: Status) -> bool {
    matches!(status, Status::HostOldVersion | Status::DeviceOldVersion)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
