use anyhow::{bail, ensure, Context, Result};

/// Contiguous run of bytes loaded from an Intel HEX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub address: u32,
    pub data: Vec<u8>,
}

impl Chunk {
    fn end(&self) -> u32 {
        self.address + self.data.len() as u32
    }
}

/// Flat firmware image, gaps filled with erased-flash bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub base: u32,
    pub bytes: Vec<u8>,
}

const DATA: u8 = 0x00;
const END_OF_FILE: u8 = 0x01;
const EXTENDED_SEGMENT: u8 = 0x02;
const EXTENDED_LINEAR: u8 = 0x04;

/// Parse Intel HEX text into address-ordered chunks.
///
/// Record types: data, end of file, extended segment address and extended
/// linear address. Adjacent data records are merged.
pub fn parse(input: &str) -> Result<Vec<Chunk>> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut offset: u32 = 0;

    for (number, line) in input.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix(':') else {
            bail!("line {}: record does not start with ':'", number);
        };
        let record = decode(body).with_context(|| format!("line {}: bad hex digits", number))?;

        ensure!(record.len() >= 5, "line {}: record too short", number);
        let len = usize::from(record[0]);
        ensure!(
            record.len() == len + 5,
            "line {}: length byte says {} data bytes, record has {}",
            number,
            len,
            record.len() - 5
        );
        ensure!(
            record.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)) == 0,
            "line {}: checksum mismatch",
            number
        );

        let address = u32::from(u16::from_be_bytes([record[1], record[2]]));
        let payload = &record[4..4 + len];

        match record[3] {
            DATA => {
                let start = offset + address;
                match chunks.last_mut() {
                    Some(last) if last.end() == start => last.data.extend_from_slice(payload),
                    _ => chunks.push(Chunk {
                        address: start,
                        data: payload.to_vec(),
                    }),
                }
            }
            END_OF_FILE => break,
            EXTENDED_SEGMENT => {
                ensure!(len == 2, "line {}: segment address record needs 2 bytes", number);
                offset = u32::from(u16::from_be_bytes([payload[0], payload[1]])) << 4;
            }
            EXTENDED_LINEAR => {
                ensure!(len == 2, "line {}: linear address record needs 2 bytes", number);
                offset = u32::from(u16::from_be_bytes([payload[0], payload[1]])) << 16;
            }
            other => bail!("line {}: unsupported record type 0x{:02X}", number, other),
        }
    }

    Ok(chunks)
}

/// Lay the chunks out as one image starting at the lowest address.
pub fn flatten(chunks: &[Chunk]) -> Result<Image> {
    let (Some(base), Some(end)) = (
        chunks.iter().map(|c| c.address).min(),
        chunks.iter().map(Chunk::end).max(),
    ) else {
        bail!("HEX file contains no data");
    };

    let mut bytes = vec![0xFF; (end - base) as usize];
    for chunk in chunks {
        let at = (chunk.address - base) as usize;
        bytes[at..at + chunk.data.len()].copy_from_slice(&chunk.data);
    }

    Ok(Image { base, bytes })
}

fn decode(digits: &str) -> Result<Vec<u8>> {
    ensure!(digits.len() % 2 == 0, "odd number of hex digits");
    digits
        .as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .with_context(|| format!("invalid hex at position {}", i * 2))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_record() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F78\n\
                   :00000001FF\n";
        let chunks = parse(hex).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].address, 0);
        assert_eq!(chunks[0].data, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_segment_and_linear_offsets() {
        let segment = ":020000020100FB\n\
                       :10000000112233445566778899AABBCCDDEEFF00F8\n";
        assert_eq!(parse(segment).unwrap()[0].address, 0x1000);

        let linear = ":020000040001F9\n\
                      :0100000042BD\n";
        assert_eq!(parse(linear).unwrap()[0].address, 0x1_0000);
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F00\n";
        assert!(parse(hex).is_err());
    }

    #[test]
    fn test_rejects_missing_colon() {
        assert!(parse("00000001FF\n").is_err());
    }

    #[test]
    fn test_merges_adjacent_records() {
        let hex = ":04000000AABBCCDDEE\n\
                   :04000400112233444E\n\
                   :00000001FF\n";
        let chunks = parse(hex).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data, [0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_flatten_pads_gaps() {
        let chunks = [
            Chunk {
                address: 0x100,
                data: vec![0xAA, 0xBB],
            },
            Chunk {
                address: 0x110,
                data: vec![0xCC],
            },
        ];
        let image = flatten(&chunks).unwrap();
        assert_eq!(image.base, 0x100);
        assert_eq!(image.bytes.len(), 0x11);
        assert_eq!(image.bytes[..3], [0xAA, 0xBB, 0xFF]);
        assert_eq!(image.bytes[0x10], 0xCC);
        assert!(flatten(&[]).is_err());
    }
}
