use super::*;
use std::io::Cursor;

#[test]
fn u32_round_trip() {
    let mut buf = Vec::new();
    encode::u32(&mut buf, 0xdead_beef).unwrap();
    assert_eq!(buf.len() % 4, 0);
    assert_eq!(decode::u32(&mut Cursor::new(buf)).unwrap(), 0xdead_beef);
}

#[test]
fn u64_round_trip() {
    let mut buf = Vec::new();
    encode::u64(&mut buf, u64::MAX).unwrap();
    assert_eq!(decode::u64(&mut Cursor::new(buf)).unwrap(), u64::MAX);
}

#[test]
fn bool_round_trip() {
    for b in [true, false] {
        let mut buf = Vec::new();
        encode::boolean(&mut buf, b).unwrap();
        assert_eq!(decode::boolean(&mut Cursor::new(buf)).unwrap(), b);
    }
}

#[test]
fn bool_rejects_bad_discriminant() {
    let mut buf = Vec::new();
    encode::u32(&mut buf, 2).unwrap();
    assert!(matches!(decode::boolean(&mut Cursor::new(buf)), Err(Error::CodecFailed(_))));
}

#[test]
fn opaque_fixed_pads_to_four_bytes() {
    let mut buf = Vec::new();
    encode::opaque_fixed(&mut buf, &[1u8, 2, 3]).unwrap();
    assert_eq!(buf.len(), 4);
    assert_eq!(buf, vec![1, 2, 3, 0]);
    let round: [u8; 3] = decode::opaque_fixed(&mut Cursor::new(buf)).unwrap();
    assert_eq!(round, [1, 2, 3]);
}

#[test]
fn opaque_var_round_trip_with_padding() {
    let mut buf = Vec::new();
    encode::opaque_var(&mut buf, b"abc").unwrap();
    assert_eq!(buf.len() % 4, 0);
    let round = decode::opaque_var(&mut Cursor::new(buf), 1024).unwrap();
    assert_eq!(round, b"abc");
}

#[test]
fn opaque_var_rejects_oversized_length_prefix() {
    let mut buf = Vec::new();
    encode::u32(&mut buf, 1_000_000).unwrap();
    let result = decode::opaque_var(&mut Cursor::new(buf), 64);
    assert!(matches!(result, Err(Error::CodecFailed(_))));
}

#[test]
fn string_round_trip() {
    let mut buf = Vec::new();
    encode::string(&mut buf, "hello, nfs").unwrap();
    let round = decode::string(&mut Cursor::new(buf), 1024).unwrap();
    assert_eq!(round, "hello, nfs");
}

#[test]
fn array_round_trip() {
    let values = vec![1u32, 2, 3, 4, 5];
    let mut buf = Vec::new();
    encode::array(&mut buf, &values, |v, w| encode::u32(w, *v)).unwrap();
    let round = decode::array(&mut Cursor::new(buf), 64, |r| decode::u32(r)).unwrap();
    assert_eq!(round, values);
}

#[test]
fn option_round_trip() {
    let mut buf_some = Vec::new();
    encode::option(&mut buf_some, &Some(7u32), |v, w| encode::u32(w, *v)).unwrap();
    let round = decode::option(&mut Cursor::new(buf_some), |r| decode::u32(r)).unwrap();
    assert_eq!(round, Some(7));

    let mut buf_none = Vec::new();
    encode::option::<u32>(&mut buf_none, &None, |v, w| encode::u32(w, *v)).unwrap();
    let round = decode::option(&mut Cursor::new(buf_none), |r| decode::u32(r)).unwrap();
    assert_eq!(round, None);
}

/// Property: decoding never panics on arbitrary truncated/garbage bytes; it
/// either succeeds or returns a typed error.
#[test]
fn decoder_never_panics_on_garbage() {
    let seeds: &[&[u8]] = &[
        &[],
        &[0, 0, 0],
        &[0xff, 0xff, 0xff, 0xff],
        &[0, 0, 0, 1],
        &[0, 0, 0, 5, 1, 2, 3],
    ];
    for seed in seeds {
        let _ = decode::u32(&mut Cursor::new(seed.to_vec()));
        let _ = decode::boolean(&mut Cursor::new(seed.to_vec()));
        let _ = decode::opaque_var(&mut Cursor::new(seed.to_vec()), 4096);
        let _ = decode::string(&mut Cursor::new(seed.to_vec()), 4096);
        let _ = decode::array(&mut Cursor::new(seed.to_vec()), 4096, |r| decode::u32(r));
    }
}

#[test]
fn pad4_rounds_up_to_four_byte_alignment() {
    assert_eq!(pad4(0), 0);
    assert_eq!(pad4(1), 3);
    assert_eq!(pad4(2), 2);
    assert_eq!(pad4(3), 1);
    assert_eq!(pad4(4), 0);
    assert_eq!(pad4(5), 3);
}
