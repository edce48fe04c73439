//! Example driving a peripheral through a loopback backend
//!
//! The backend just prints what the core asks of the radio. The main
//! function plays the part of the link layer, feeding connection, read,
//! write and subscription events into the core.

use rustyperiph::peripheral::constants::ATT_MAX_ATTRIBUTE_LEN;
use rustyperiph::{
    BdAddr, DeferredToken, FixedByteBuffer, Listener, Peripheral, PeripheralBackend, ReadResult,
    WriteResult,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::error::Error;
use std::sync::{Arc, Mutex};

const UART_SERVICE: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";
const UART_RX: &str = "6e400002-b5a3-f393-e0a9-e50e24dcca9e";
const UART_TX: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";
const BATTERY_LEVEL: &str = "2a19";

struct LoopbackBackend;

impl PeripheralBackend for LoopbackBackend {
    fn send_notification(&mut self, service_uuid: &str, characteristic_uuid: &str, data: &[u8]) {
        println!("radio: notify {}/{} {}", service_uuid, characteristic_uuid, hex::encode(data));
    }

    fn send_deferred_read_response(
        &mut self,
        address: &BdAddr,
        service_uuid: &str,
        characteristic_uuid: &str,
        result: ReadResult,
        data: &[u8],
    ) {
        println!(
            "radio: read response to {} for {}/{}: {:?} {}",
            address,
            service_uuid,
            characteristic_uuid,
            result,
            hex::encode(data)
        );
    }

    fn send_deferred_write_response(
        &mut self,
        address: &BdAddr,
        service_uuid: &str,
        characteristic_uuid: &str,
        result: WriteResult,
    ) {
        println!(
            "radio: write response to {} for {}/{}: 0x{:04X}",
            address,
            service_uuid,
            characteristic_uuid,
            u16::from(result)
        );
    }

    fn set_advertising_info(&mut self, period_ms: u32, data: &[u8]) {
        println!("radio: advertise every {} ms: {}", period_ms, hex::encode(data));
    }

    fn start_advertising(&mut self) {
        println!("radio: advertising started");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let mut peripheral = Peripheral::new(LoopbackBackend);
    let config = peripheral.config();
    println!(
        "Peripheral with room for {} characteristics and {} deferred operations",
        config.max_characteristics, config.max_deferred_operations
    );

    peripheral.add_listener(
        Listener::new()
            .on_ready(|| println!("app: peripheral ready"))
            .on_connection_opened(|addr| println!("app: {} connected", addr))
            .on_connection_closed(|addr| println!("app: {} disconnected", addr)),
    )?;

    // Battery level is answered on the spot
    let battery = Arc::new(Mutex::new(87u8));
    let level = battery.clone();
    peripheral.register_read_handler(UART_SERVICE, BATTERY_LEVEL, false, false, move |out| {
        let Ok(level) = level.lock() else {
            return ReadResult::Unlikely;
        };
        match out.append_u8(*level) {
            Ok(()) => ReadResult::Success,
            Err(_) => ReadResult::Unlikely,
        }
    })?;

    // TX reads are answered later, once the "sensor" has a value
    let pending_reads: Arc<Mutex<Vec<DeferredToken>>> = Arc::new(Mutex::new(Vec::new()));
    let stash = pending_reads.clone();
    peripheral.register_deferred_read_handler(UART_SERVICE, UART_TX, true, false, move |token| {
        match stash.lock() {
            Ok(mut pending) => {
                pending.push(token);
                ReadResult::Success
            }
            Err(_) => ReadResult::Unlikely,
        }
    })?;
    peripheral.register_subscription_changed_handler(UART_SERVICE, UART_TX, |subscribed| {
        println!("app: TX subscription {}", if subscribed { "on" } else { "off" });
    })?;

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    peripheral.register_write_handler(UART_SERVICE, UART_RX, move |data| {
        if data.is_empty() {
            return WriteResult::ValueNotAllowed;
        }
        match sink.lock() {
            Ok(mut received) => {
                received.extend_from_slice(data);
                WriteResult::Success
            }
            Err(_) => WriteResult::Unlikely,
        }
    })?;

    // Applied once the backend reports readiness
    peripheral.set_advertising_info_manufacturer_specific(100, 0xFFFF, b"loopback")?;
    peripheral.start();
    peripheral.notify_on_becomes_ready();

    let central = BdAddr::random();
    println!("Simulating central {} ({})", central, central.to_short_string());
    peripheral.notify_connection_opened(&central);

    let mut read_buffer = FixedByteBuffer::new(ATT_MAX_ATTRIBUTE_LEN);
    let outcome =
        peripheral.notify_read_request(&central, UART_SERVICE, BATTERY_LEVEL, &mut read_buffer);
    println!("link: battery read {:?} -> {}", outcome, read_buffer.to_hex());

    let outcome = peripheral.notify_write_request(&central, UART_SERVICE, UART_RX, b"ping");
    println!("link: RX write {:?}", outcome);
    let outcome = peripheral.notify_write_request(&central, UART_SERVICE, UART_RX, &[]);
    println!("link: empty RX write {:?}", outcome);

    let outcome = peripheral.notify_read_request(&central, UART_SERVICE, UART_TX, &mut read_buffer);
    println!(
        "link: TX read {:?}, {} pending",
        outcome,
        peripheral.pending_deferred_operations()
    );

    let token = pending_reads.lock().map_err(|_| "pending reads poisoned")?.pop();
    if let Some(token) = token {
        let echo = received.lock().map_err(|_| "received data poisoned")?.clone();
        peripheral.complete_deferred_read(token, ReadResult::Success, &echo)?;
        // A token is good for one answer only
        if let Err(err) = peripheral.complete_deferred_read(token, ReadResult::Success, &echo) {
            println!("app: second completion refused: {}", err);
        }
    }

    peripheral.notify_subscription_changed(UART_SERVICE, UART_TX, true);
    peripheral.send_notification(UART_SERVICE, UART_TX, b"pong")?;
    if let Err(err) = peripheral.send_notification(UART_SERVICE, BATTERY_LEVEL, &[0x56]) {
        println!("app: battery notification refused: {}", err);
    }

    // A read left pending is dropped when the central goes away
    peripheral.notify_read_request(&central, UART_SERVICE, UART_TX, &mut read_buffer);
    peripheral.notify_connection_closed(&central);
    println!(
        "Done, {} deferred operations pending",
        peripheral.pending_deferred_operations()
    );

    Ok(())
}
