// marmoset-vm - Property-based tests for instruction encoding and hash keys
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the encode/decode round-trip law and
//! hash-key consistency.
//!
//! The round-trip law: for any opcode and operands fitting their declared
//! widths, decoding an encoded instruction yields the same opcode and
//! operands. The hash contract: structurally equal hashable values derive
//! equal hash keys.

use proptest::prelude::*;

use marmoset_vm::{Op, Value, make, read_operands};

/// Every defined opcode, recovered through the public byte decoder.
fn all_opcodes() -> Vec<Op> {
    (0..=u8::MAX).filter_map(Op::from_byte).collect()
}

/// Clamp raw values to an opcode's operand widths.
fn operands_for(op: Op, wide: u16, narrow: u8) -> Vec<usize> {
    op.operand_widths()
        .iter()
        .map(|width| match width {
            2 => wide as usize,
            1 => narrow as usize,
            _ => unreachable!("unsupported operand width {}", width),
        })
        .collect()
}

fn opcode_strategy() -> impl Strategy<Value = Op> {
    any::<u8>().prop_filter_map("defined opcode", Op::from_byte)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// decode(encode(op, operands)) == (op, operands), and the decoder
    /// consumes exactly the encoded operand bytes.
    #[test]
    fn encode_decode_round_trip(op in opcode_strategy(), wide in any::<u16>(), narrow in any::<u8>()) {
        let operands = operands_for(op, wide, narrow);
        let encoded = make(op, &operands);

        prop_assert_eq!(Op::from_byte(encoded.as_bytes()[0]), Some(op));
        let (decoded, read) = read_operands(op, &encoded.as_bytes()[1..]);
        prop_assert_eq!(decoded, operands);
        prop_assert_eq!(read, encoded.len() - 1);
    }

    /// A stream of instructions decodes back to the same sequence when
    /// walked front to back.
    #[test]
    fn instruction_streams_decode_in_sequence(
        raw in prop::collection::vec((opcode_strategy(), any::<u16>(), any::<u8>()), 0..32)
    ) {
        let instructions: Vec<(Op, Vec<usize>)> = raw
            .into_iter()
            .map(|(op, wide, narrow)| (op, operands_for(op, wide, narrow)))
            .collect();

        let mut stream = Vec::new();
        for (op, operands) in &instructions {
            stream.extend_from_slice(make(*op, operands).as_bytes());
        }

        let mut decoded = Vec::new();
        let mut offset = 0;
        while offset < stream.len() {
            let op = Op::from_byte(stream[offset]).expect("defined opcode");
            let (operands, read) = read_operands(op, &stream[offset + 1..]);
            decoded.push((op, operands));
            offset += 1 + read;
        }

        prop_assert_eq!(decoded, instructions);
    }

    /// Operand width is a function of the opcode alone: encoded length is
    /// 1 + sum of declared widths.
    #[test]
    fn encoded_length_matches_declared_widths(op in opcode_strategy(), wide in any::<u16>(), narrow in any::<u8>()) {
        let operands = operands_for(op, wide, narrow);
        let encoded = make(op, &operands);
        prop_assert_eq!(encoded.len(), 1 + op.operand_widths().iter().sum::<usize>());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Equal strings derive equal hash keys regardless of allocation.
    #[test]
    fn string_hash_key_consistency(s in ".*") {
        let a = Value::string(s.as_str());
        let b = Value::string(s.as_str());
        prop_assert_eq!(a.hash_key(), b.hash_key());
        prop_assert!(a.hash_key().is_some());
    }

    /// Equal integers derive equal hash keys; the key embeds the integer
    /// bits, so distinct integers derive distinct keys.
    #[test]
    fn integer_hash_key_consistency(n in any::<i64>(), m in any::<i64>()) {
        let key_n = Value::Integer(n).hash_key();
        let key_m = Value::Integer(m).hash_key();
        prop_assert_eq!(key_n, Value::Integer(n).hash_key());
        prop_assert_eq!(key_n == key_m, n == m);
    }

    /// Hash keys are tagged by type: an integer key never collides with a
    /// boolean key.
    #[test]
    fn hash_keys_are_type_tagged(n in any::<i64>(), b in any::<bool>()) {
        prop_assert_ne!(Value::Integer(n).hash_key(), Value::Boolean(b).hash_key());
    }
}

#[test]
fn all_opcodes_are_byte_stable() {
    // from_byte(op as u8) is the identity on defined opcodes.
    for op in all_opcodes() {
        assert_eq!(Op::from_byte(op as u8), Some(op));
    }
}
