mod mockusb;

use mockusb::MockTransport;
use usbjtag_rs::cmd::JtagCmd;
use usbjtag_rs::{Opcode, UsbJtag, UsbJtagError};

fn jtag() -> UsbJtag<MockTransport> {
    UsbJtag::new(MockTransport::new())
}

#[test]
fn slow_write_frame() {
    let mut jtag = jtag();
    jtag.jtag_write(&[0x01, 0x02], &[0xaa, 0xbb]).unwrap();
    assert_eq!(
        jtag.transport().writes,
        vec![vec![0x01, 0x00, 0x01, 0x02, 0xaa, 0xbb]]
    );
}

#[test]
fn slow_length_rules() {
    let mut jtag = jtag();
    let cases: [(&[u8], &[u8]); 4] = [
        (&[], &[]),
        (&[0x00], &[0x00, 0x00]),
        (&[0x00; 32], &[0x00; 32]),
        (&[0x00; 3], &[0x00; 2]),
    ];
    for (tms, tdi) in cases {
        assert!(matches!(
            jtag.jtag_write(tms, tdi),
            Err(UsbJtagError::InvalidLength)
        ));
        assert!(matches!(
            jtag.jtag_write_read(tms, tdi),
            Err(UsbJtagError::InvalidLength)
        ));
    }
    assert!(jtag.transport().writes.is_empty());
    assert_eq!(jtag.transport().reads, 0);

    jtag.jtag_write(&[0x00; 31], &[0x00; 31]).unwrap();
    assert_eq!(jtag.transport().writes[0].len(), 64);
}

#[test]
fn slow_read_keeps_order() {
    let mut jtag = jtag();
    jtag.transport_mut().respond(&[0x01, 0x02, 0x03]);
    let tdo = jtag
        .jtag_write_read(&[0x00; 3], &[0x10, 0x20, 0x30])
        .unwrap();
    assert_eq!(tdo, vec![0x01, 0x02, 0x03]);
    assert_eq!(
        jtag.transport().writes[0],
        vec![0x01, 0x01, 0x00, 0x00, 0x00, 0x10, 0x20, 0x30]
    );
}

#[test]
fn slow_read_length_mismatch() {
    let mut jtag = jtag();
    jtag.transport_mut().respond(&[0x01]);
    assert!(matches!(
        jtag.jtag_write_read(&[0x00; 2], &[0x00; 2]),
        Err(UsbJtagError::UnexpectedResponseLength {
            expected: 2,
            actual: 1
        })
    ));
}

#[test]
fn fast_frames() {
    let mut jtag = jtag();
    jtag.jtag_write_fast(&[0x11; 62]).unwrap();
    let tdo = jtag.jtag_write_read_fast(&[0x01, 0x02]).unwrap();
    assert_eq!(tdo, vec![0x01, 0x02]);

    let t = jtag.transport();
    assert_eq!(t.writes[0].len(), 64);
    assert_eq!(&t.writes[0][..2], &[0x01, 0x02]);
    assert_eq!(t.writes[1], vec![0x01, 0x03, 0x01, 0x02]);
}

#[test]
fn fast_length_rules() {
    let mut jtag = jtag();
    assert!(matches!(
        jtag.jtag_write_fast(&[]),
        Err(UsbJtagError::InvalidLength)
    ));
    assert!(matches!(
        jtag.jtag_write_read_fast(&[0x00; 63]),
        Err(UsbJtagError::InvalidLength)
    ));
    assert!(jtag.transport().writes.is_empty());
}

#[test]
fn run_test_idle_chunks() {
    let mut jtag = jtag();
    jtag.run_test_idle(0).unwrap();
    jtag.run_test_idle(70).unwrap();

    let frames = jtag.transport().frames(Opcode::Jtag, JtagCmd::Write as u8);
    let lens: Vec<usize> = frames.iter().map(|f| (f.len() - 2) / 2).collect();
    assert_eq!(lens, vec![1, 31, 31, 8]);
    assert!(frames.iter().all(|f| f[2..].iter().all(|&b| b == 0)));
}

#[test]
fn spi_write_frame() {
    let mut jtag = jtag();
    jtag.spi_write(&[0x9f, 0x00]).unwrap();
    assert_eq!(jtag.transport().writes, vec![vec![0x02, 0x00, 0x9f, 0x00]]);
    assert_eq!(jtag.transport().reads, 0);
}

#[test]
fn spi_full_duplex() {
    let mut jtag = jtag();
    let rx = jtag.spi_write_read(&[0x00, 0xf0, 0xff]).unwrap();
    assert_eq!(rx, vec![0xff, 0x0f, 0x00]);
    assert_eq!(jtag.transport().writes[0], vec![0x02, 0x01, 0x00, 0xf0, 0xff]);

    jtag.transport_mut().respond(&[0x00; 2]);
    assert!(matches!(
        jtag.spi_write_read(&[0x00; 3]),
        Err(UsbJtagError::UnexpectedResponseLength {
            expected: 3,
            actual: 2
        })
    ));
}

#[test]
fn spi_length_rules() {
    let mut jtag = jtag();
    assert!(matches!(
        jtag.spi_write(&[]),
        Err(UsbJtagError::InvalidLength)
    ));
    assert!(matches!(
        jtag.spi_write(&[0x00; 63]),
        Err(UsbJtagError::InvalidLength)
    ));
    assert!(matches!(
        jtag.spi_write_read(&[0x00; 63]),
        Err(UsbJtagError::InvalidLength)
    ));
    assert!(jtag.transport().writes.is_empty());

    jtag.spi_write(&[0x00; 62]).unwrap();
    assert_eq!(jtag.transport().writes[0].len(), 64);
}
