//! End-to-end exercise of the bus emulators through the transport
//! surface, the way a driver under test would reach them.

use mockbus_core::{
    BusError, BusMessage, MockBus, Polarity, PwmChange, PwmState, SmbusData, SmbusSize,
    BANK_CAPACITY, REG_BUF_SIZE, SMBUS_BLOCK_MAX,
};

const DEV: u16 = 0x1C;

#[test]
fn i2c_register_round_trip() {
    let mut bus = MockBus::new();
    let payload = [0x11u8, 0x22, 0x33, 0x44];

    let mut msg = vec![0x4A];
    msg.extend_from_slice(&payload);
    bus.i2c_transfer(DEV, &mut [BusMessage::write(&msg)]).unwrap();

    // Register-less read right after the addressed write hits the same
    // register (sticky), not the register-less buffer
    let mut msgs = [BusMessage::read(payload.len())];
    bus.i2c_transfer(DEV, &mut msgs).unwrap();
    assert_eq!(msgs[0].buf, payload);
}

#[test]
fn i2c_bank_exhaustion_then_reuse() {
    let mut bus = MockBus::new();
    for r in 0..BANK_CAPACITY as u8 {
        bus.i2c_transfer(DEV, &mut [BusMessage::write(&[0xA0 + r, 0x01])])
            .unwrap();
    }
    // Unseen address on a full bank fails...
    assert_eq!(
        bus.i2c_transfer(DEV, &mut [BusMessage::write(&[0x01, 0x01])]),
        Err(BusError::RegisterBankFull)
    );
    // ...but an already-bound register still resolves
    bus.i2c_transfer(DEV, &mut [BusMessage::write(&[0xA0, 0x02])])
        .unwrap();
    let mut msgs = [BusMessage::read(1)];
    bus.i2c_transfer(DEV, &mut msgs).unwrap();
    assert_eq!(msgs[0].buf, vec![0x02]);
}

#[test]
fn i2c_full_buffer_round_trip() {
    let mut bus = MockBus::new();
    // Fill an entire register buffer through a multi-message write
    let data: Vec<u8> = (0..REG_BUF_SIZE).map(|i| (i % 251) as u8).collect();
    let mut phase = vec![0x00]; // data phase: leading byte is stripped
    phase.extend_from_slice(&data);
    bus.i2c_transfer(
        DEV,
        &mut [BusMessage::write(&[0x5B]), BusMessage::write(&phase)],
    )
    .unwrap();

    let mut msgs = [BusMessage::write(&[0x5B]), BusMessage::read(REG_BUF_SIZE)];
    bus.i2c_transfer(DEV, &mut msgs).unwrap();
    assert_eq!(msgs[1].buf, data);
}

#[test]
fn smbus_word_round_trip() {
    let mut bus = MockBus::new();
    let mut data = SmbusData::Word(0x1234);
    bus.smbus_transfer(DEV, 0x08, false, SmbusSize::WordData, &mut data)
        .unwrap();

    let mut out = SmbusData::None;
    bus.smbus_transfer(DEV, 0x08, true, SmbusSize::WordData, &mut out)
        .unwrap();
    assert_eq!(out, SmbusData::Word(0x1234));
}

#[test]
fn smbus_block_write_then_read() {
    let mut bus = MockBus::new();
    let mut data = SmbusData::Block(vec![0xCA, 0xFE]);
    bus.smbus_transfer(DEV, 0x09, false, SmbusSize::BlockData, &mut data)
        .unwrap();

    let mut out = SmbusData::None;
    bus.smbus_transfer(DEV, 0x09, true, SmbusSize::BlockData, &mut out)
        .unwrap();
    match out {
        SmbusData::Block(b) => {
            assert_eq!(b.len(), SMBUS_BLOCK_MAX);
            assert_eq!(&b[..2], &[0xCA, 0xFE]);
        }
        other => panic!("expected block, got {:?}", other),
    }
}

#[test]
fn smbus_and_raw_paths_share_registers() {
    let mut bus = MockBus::new();
    // SMBus byte-data write, raw read of the same register
    let mut data = SmbusData::Byte(0x5A);
    bus.smbus_transfer(DEV, 0x30, false, SmbusSize::ByteData, &mut data)
        .unwrap();

    let mut msgs = [BusMessage::write(&[0x30]), BusMessage::read(1)];
    bus.i2c_transfer(DEV, &mut msgs).unwrap();
    assert_eq!(msgs[1].buf, vec![0x5A]);
}

#[test]
fn spi_echo_then_replay() {
    let mut bus = MockBus::new();
    let rx = bus.spi_transfer(Some(&[1, 2, 3]), Some(3)).unwrap();
    assert_eq!(rx, Some(vec![1, 2, 3]));
    let rx = bus.spi_transfer(None, Some(3)).unwrap();
    assert_eq!(rx, Some(vec![1, 2, 3]));
}

#[test]
fn pwm_apply_reports_period_change_only() {
    let mut bus = MockBus::new();
    bus.pwm_export(0).unwrap();
    bus.pwm_apply(
        0,
        PwmState { period: 50, duty_cycle: 20, polarity: Polarity::Normal, enabled: true },
    )
    .unwrap();

    let changes = bus
        .pwm_apply(
            0,
            PwmState { period: 100, duty_cycle: 20, polarity: Polarity::Normal, enabled: true },
        )
        .unwrap();
    assert_eq!(changes, vec![PwmChange::Period(100)]);

    assert_eq!(bus.pwm_get_state(0).unwrap().period, 100);
    bus.pwm_unexport(0).unwrap();
}

#[test]
fn errors_do_not_poison_the_bus() {
    let mut bus = MockBus::new();
    assert_eq!(
        bus.i2c_transfer(DEV, &mut []),
        Err(BusError::UnsupportedTransactionShape)
    );
    let mut data = SmbusData::None;
    assert_eq!(
        bus.smbus_transfer(DEV, 0x01, true, SmbusSize::BlockProcCall, &mut data),
        Err(BusError::UnsupportedTransactionShape)
    );
    // The device keeps working afterwards
    bus.i2c_transfer(DEV, &mut [BusMessage::write(&[0x10, 0xEE])])
        .unwrap();
    let mut msgs = [BusMessage::read(1)];
    bus.i2c_transfer(DEV, &mut msgs).unwrap();
    assert_eq!(msgs[0].buf, vec![0xEE]);
}
