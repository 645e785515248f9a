//! Scripted exerciser for the mockbus emulators.
//!
//! Drives each emulator through a representative transaction sequence
//! and prints the traffic, so the emulators can be eyeballed without
//! wiring up a real driver:
//!
//! - I2C: register-addressed write, sticky register-less read-back,
//!   register bank exhaustion
//! - SMBus: byte-data and word-data round trips, block transfer
//! - SPI: full-duplex echo, stale-buffer replay
//! - PWM: export, state apply with per-field change reporting
//!
//! Run with `-v` (or `RUST_LOG=debug`) to see the emulators' own
//! traffic traces alongside the script output.

use std::env;
use std::process::ExitCode;

use log::info;
use mockbus_core::{
    BusError, BusMessage, MockBus, Polarity, PwmState, SmbusData, SmbusSize, BANK_CAPACITY,
};

/// Bus address the scripted device lives at.
const DEV_ADDR: u16 = 0x1C;

fn run_i2c(bus: &mut MockBus) -> Result<(), BusError> {
    info!("--- i2c ---");
    bus.i2c_transfer(DEV_ADDR, &mut [BusMessage::write(&[0x10, 0xDE, 0xAD, 0xBE, 0xEF])])?;

    let mut msgs = [BusMessage::read(4)];
    bus.i2c_transfer(DEV_ADDR, &mut msgs)?;
    println!("i2c sticky read-back: {:02X?}", msgs[0].buf);

    // Fill the bank and show the NACK a driver would see
    for r in 0..BANK_CAPACITY as u8 {
        bus.i2c_transfer(DEV_ADDR, &mut [BusMessage::write(&[0x10 + r, 0x00])])?;
    }
    match bus.i2c_transfer(DEV_ADDR, &mut [BusMessage::write(&[0xE0, 0x00])]) {
        Err(BusError::RegisterBankFull) => println!("i2c bank full: new register rejected"),
        other => println!("i2c bank full: unexpected result {:?}", other),
    }
    Ok(())
}

fn run_smbus(bus: &mut MockBus) -> Result<(), BusError> {
    info!("--- smbus ---");
    let mut data = SmbusData::Byte(0x42);
    bus.smbus_transfer(DEV_ADDR, 0x05, false, SmbusSize::ByteData, &mut data)?;
    let mut out = SmbusData::None;
    bus.smbus_transfer(DEV_ADDR, 0x05, true, SmbusSize::ByteData, &mut out)?;
    println!("smbus byte-data round trip: {:?}", out);

    let mut data = SmbusData::Word(0xBEEF);
    bus.smbus_transfer(DEV_ADDR, 0x06, false, SmbusSize::WordData, &mut data)?;
    let mut out = SmbusData::None;
    bus.smbus_transfer(DEV_ADDR, 0x06, true, SmbusSize::WordData, &mut out)?;
    println!("smbus word-data round trip: {:?}", out);

    let mut data = SmbusData::Block(vec![1, 2, 3, 4]);
    bus.smbus_transfer(DEV_ADDR, 0x07, false, SmbusSize::BlockData, &mut data)?;
    let mut out = SmbusData::None;
    bus.smbus_transfer(DEV_ADDR, 0x07, true, SmbusSize::BlockData, &mut out)?;
    if let SmbusData::Block(b) = &out {
        println!("smbus block read: {} bytes, head {:02X?}", b.len(), &b[..4]);
    }
    Ok(())
}

fn run_spi(bus: &mut MockBus) -> Result<(), BusError> {
    info!("--- spi ---");
    let rx = bus.spi_transfer(Some(&[0xAA, 0xBB, 0xCC]), Some(3))?;
    println!("spi full-duplex echo: {:02X?}", rx);
    let rx = bus.spi_transfer(None, Some(3))?;
    println!("spi stale replay:     {:02X?}", rx);
    Ok(())
}

fn run_pwm(bus: &mut MockBus) -> Result<(), BusError> {
    info!("--- pwm ---");
    bus.pwm_export(0)?;
    bus.pwm_apply(
        0,
        PwmState { period: 20_000_000, duty_cycle: 10_000_000, polarity: Polarity::Normal, enabled: true },
    )?;
    // Only the duty cycle differs: exactly one change reported
    let changes = bus.pwm_apply(
        0,
        PwmState { period: 20_000_000, duty_cycle: 5_000_000, polarity: Polarity::Normal, enabled: true },
    )?;
    println!("pwm changes on re-apply: {:?}", changes);
    println!("pwm state: {:?}", bus.pwm_get_state(0)?);
    bus.pwm_unexport(0)?;
    Ok(())
}

fn main() -> ExitCode {
    let verbose = env::args().any(|a| a == "-v" || a == "--verbose");
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let mut bus = MockBus::new();
    let script: [(&str, fn(&mut MockBus) -> Result<(), BusError>); 4] = [
        ("i2c", run_i2c),
        ("smbus", run_smbus),
        ("spi", run_spi),
        ("pwm", run_pwm),
    ];
    for (name, step) in script {
        if let Err(e) = step(&mut bus) {
            eprintln!("{} sequence failed: {}", name, e);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
