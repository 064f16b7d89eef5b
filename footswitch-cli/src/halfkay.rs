//! Teensy 2.0 HalfKay bootloader client.
//!
//! The footswitch firmware has no USB stack, so the board only shows up on
//! the bus while the Teensy's reset button has put it in the bootloader.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusb::{Device, DeviceHandle, GlobalContext};
use std::time::Duration;

use crate::hex::Image;

const VID: u16 = 0x16C0;
const PID: u16 = 0x0478;

/// ATmega32U4 flash geometry.
const PAGE_SIZE: usize = 128;
const FLASH_SIZE: usize = 32 * 1024;

const TIMEOUT: Duration = Duration::from_secs(2);
const PAGE_PROGRAM_TIME: Duration = Duration::from_millis(5);

/// Address that makes HalfKay leave the bootloader.
const REBOOT_ADDRESS: u16 = 0xFFFF;

fn find() -> Result<Option<Device<GlobalContext>>> {
    for device in rusb::devices().context("listing USB devices")?.iter() {
        let desc = device.device_descriptor().context("reading device descriptor")?;
        if desc.vendor_id() == VID && desc.product_id() == PID {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

pub fn detect() -> Result<bool> {
    Ok(find()?.is_some())
}

/// Poll for the bootloader for up to `attempts` × 100ms.
pub fn wait_for(attempts: u32) -> Result<bool> {
    for _ in 0..attempts {
        if detect()? {
            return Ok(true);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Ok(false)
}

/// Program `image` page by page, then start it.
pub fn flash(image: &Image) -> Result<()> {
    let end = image.base as usize + image.bytes.len();
    if end > FLASH_SIZE {
        bail!(
            "image of {} bytes at 0x{:04X} does not fit in {} bytes of flash",
            image.bytes.len(),
            image.base,
            FLASH_SIZE
        );
    }

    let Some(device) = find()? else {
        bail!("HalfKay bootloader not found; press the reset button on the Teensy");
    };
    let handle = device
        .open()
        .context("opening the bootloader (may need root or a udev rule)")?;

    let pages = image.bytes.len().div_ceil(PAGE_SIZE);
    let progress = ProgressBar::new(pages as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
            .context("progress template")?
            .progress_chars("=> "),
    );
    progress.set_message("Flashing");

    for (index, page) in image.bytes.chunks(PAGE_SIZE).enumerate() {
        let address = image.base as usize + index * PAGE_SIZE;
        // Erased pages need no programming
        if page.iter().any(|&b| b != 0xFF) {
            send(&handle, address as u16, page)
                .with_context(|| format!("writing page at 0x{:04X}", address))?;
            std::thread::sleep(PAGE_PROGRAM_TIME);
        }
        progress.inc(1);
    }
    progress.finish_with_message("Flashed");

    // The device drops off the bus straight away, so the transfer may fail
    let _ = send(&handle, REBOOT_ADDRESS, &[]);
    log::info!("bootloader left, footswitch firmware starting");

    Ok(())
}

/// One HID SET_REPORT: little-endian address followed by a full page.
fn send(handle: &DeviceHandle<GlobalContext>, address: u16, data: &[u8]) -> Result<()> {
    let mut report = [0xFFu8; 2 + PAGE_SIZE];
    report[..2].copy_from_slice(&address.to_le_bytes());
    report[2..2 + data.len()].copy_from_slice(data);
    // host-to-device class request to interface 0, output report 0
    handle
        .write_control(0x21, 0x09, 0x0200, 0, &report, TIMEOUT)
        .context("USB control transfer failed")?;
    Ok(())
}
