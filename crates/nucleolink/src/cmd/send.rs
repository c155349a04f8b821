use std::thread;

use nucleolink_session::{connect_with_config, InitConfig, Session};
use nucleolink_transport::Transport;

use crate::cmd::SendArgs;
use crate::exit::{session_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_readings, print_sent, OutputFormat, Reading, SentOutput};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.link.session_config()?;
    let init = args.link.init_config();
    let mut session = connect_with_config(config, args.link.serial_config())
        .map_err(|err| session_error("connect failed", err))?;

    let sent = send_once(&mut session, &init, args.command, &args.values)?;
    print_sent(&sent, format);

    if args.wait {
        let echo = wait_for_echo(&mut session, &init, args.command)?;
        print_readings(&[echo], format);
    }

    Ok(SUCCESS)
}

/// Handshake, then write one command frame.
fn send_once<T: Transport>(
    session: &mut Session<T>,
    init: &InitConfig,
    command: u8,
    values: &[u16],
) -> CliResult<SentOutput> {
    session
        .handshake(init)
        .map_err(|err| session_error("init failed", err))?;
    let bytes_written = session
        .send(command, values)
        .map_err(|err| session_error("send failed", err))?;
    Ok(SentOutput {
        command,
        values: values.to_vec(),
        bytes_written,
    })
}

/// Poll with the init retry budget until the device echoes `command`.
fn wait_for_echo<T: Transport>(
    session: &mut Session<T>,
    init: &InitConfig,
    command: u8,
) -> CliResult<Reading> {
    let attempts = init.max_retries.max(1);
    for attempt in 1..=attempts {
        session
            .poll()
            .map_err(|err| session_error("receive failed", err))?;
        if session.buffer().contains(command) {
            return Ok(Reading {
                iteration: 0,
                label: "echo".to_string(),
                key: command,
                entry: session.fetch(command),
            });
        }
        if attempt < attempts {
            thread::sleep(init.retry_delay);
        }
    }
    Err(CliError::new(
        TIMEOUT,
        format!("no echo for command {command:#04x} after {attempts} polls"),
    ))
}
