//! Transactions: field types and signing in `types`, rule checks in `validation`

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::crypto::{Address, KeyPair};
    use crate::error::ChainError;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::{TimeZone, Utc};

    fn config() -> ChainConfig {
        ChainConfig::default()
    }

    fn transfer_data(from: &KeyPair, to: &KeyPair) -> TransactionData {
        TransactionData::new(
            TransactionKind::Transfer,
            Some(from.address()),
            to.address(),
            from.public_key_hex(),
            10,
            2,
        )
    }

    #[test]
    fn test_transfer_creation() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let tx = Transaction::transfer(&alice, bob.address(), 10, 2, None, &config()).unwrap();
        assert_eq!(tx.kind(), TransactionKind::Transfer);
        assert_eq!(tx.sender(), Some(&alice.address()));
        assert_eq!(tx.recipient(), &bob.address());
        assert_eq!(tx.public_key(), alice.public_key_hex());
        assert_eq!(tx.value(), 10);
        assert_eq!(tx.fee(), 2);
        assert_eq!(tx.id().len(), 64);
    }

    #[test]
    fn test_reconstruct_round_trip() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let data = transfer_data(&alice, &bob).with_message("rent for march");
        let tx = Transaction::create(data, &alice, &config()).unwrap();

        let rebuilt = Transaction::reconstruct(tx.datastring(), tx.signature(), &config()).unwrap();
        assert_eq!(rebuilt, tx);
        assert_eq!(rebuilt.data().encode().unwrap(), tx.datastring());
        assert_eq!(rebuilt.message(), Some("rent for march"));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let first = transfer_data(&alice, &bob).with_timestamp(at);
        let second = TransactionData {
            message: None,
            ..transfer_data(&alice, &bob).with_timestamp(at)
        };
        assert_eq!(first.encode().unwrap(), second.encode().unwrap());
        assert_eq!(first.created_at(), Some(at));
    }

    #[test]
    fn test_mutated_message_fails_signature() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let data = transfer_data(&alice, &bob).with_message("hello world");
        let tx = Transaction::create(data, &alice, &config()).unwrap();

        let bytes = STANDARD.decode(tx.datastring()).unwrap();
        let start = bytes
            .windows(b"hello world".len())
            .position(|w| w == b"hello world")
            .unwrap();

        for offset in 0..b"hello world".len() {
            let mut tampered = bytes.clone();
            tampered[start + offset] = if tampered[start + offset] == b'x' { b'y' } else { b'x' };
            let datastring = STANDARD.encode(&tampered);
            assert_eq!(
                Transaction::validate(&datastring, tx.signature(), &config()),
                Err(ChainError::SignatureInvalid)
            );
        }
    }

    #[test]
    fn test_mutated_value_fails_signature() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::transfer(&alice, bob.address(), 10, 2, None, &config()).unwrap();

        let mut data = tx.data().clone();
        data.value = 1_000;
        let forged = data.encode().unwrap();
        assert_eq!(
            Transaction::reconstruct(&forged, tx.signature(), &config()),
            Err(ChainError::SignatureInvalid)
        );
    }

    #[test]
    fn test_no_single_character_mutation_validates() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::transfer(&alice, bob.address(), 10, 2, None, &config()).unwrap();

        for (i, c) in tx.datastring().char_indices() {
            if c == '=' {
                continue;
            }
            let replacement = if c == 'A' { "B" } else { "A" };
            let mut tampered = tx.datastring().to_string();
            tampered.replace_range(i..i + 1, replacement);
            // Text that no longer decodes is rejected before any signature check.
            match Transaction::validate(&tampered, tx.signature(), &config()) {
                Err(ChainError::MalformedDatastring(_)) => {}
                other => assert_eq!(other, Err(ChainError::SignatureInvalid), "position {}", i),
            }
        }
    }

    #[test]
    fn test_flipped_kind_fails_signature() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::transfer(&alice, bob.address(), 10, 2, None, &config()).unwrap();
        let bytes = STANDARD.decode(tx.datastring()).unwrap();

        for kind in [TransactionKind::CreationReward, TransactionKind::Fee] {
            let mut tampered = bytes.clone();
            tampered[0] = kind as u8;
            let datastring = STANDARD.encode(&tampered);
            assert_eq!(TransactionData::decode(&datastring).unwrap().kind, kind);
            assert_eq!(
                Transaction::validate(&datastring, tx.signature(), &config()),
                Err(ChainError::SignatureInvalid)
            );
        }
    }

    #[test]
    fn test_ownership_mismatch() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        // Signed and keyed by bob, but claims alice as the sender.
        let data = TransactionData::new(
            TransactionKind::Transfer,
            Some(alice.address()),
            bob.address(),
            bob.public_key_hex(),
            5,
            1,
        );
        let result = Transaction::create(data, &bob, &config());
        assert!(matches!(result, Err(ChainError::OwnershipMismatch { .. })));
    }

    #[test]
    fn test_embedded_key_must_match_signer() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let data = transfer_data(&alice, &bob);
        let result = Transaction::create(data, &bob, &config());
        assert_eq!(result, Err(ChainError::SignatureInvalid));
    }

    #[test]
    fn test_missing_sender() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        for kind in [
            TransactionKind::Transfer,
            TransactionKind::PublishContract,
            TransactionKind::ExecuteContract,
        ] {
            let data =
                TransactionData::new(kind, None, bob.address(), alice.public_key_hex(), 1, 0);
            assert!(matches!(
                Transaction::create(data, &alice, &config()),
                Err(ChainError::MissingSender(_))
            ));
        }
    }

    #[test]
    fn test_contract_kinds_accept_sender() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let data = TransactionData::new(
            TransactionKind::PublishContract,
            Some(alice.address()),
            bob.address(),
            alice.public_key_hex(),
            0,
            3,
        )
        .with_message("contract body");
        let tx = Transaction::create(data, &alice, &config()).unwrap();
        assert_eq!(tx.kind(), TransactionKind::PublishContract);
    }

    #[test]
    fn test_creation_reward_value_enforced() {
        let miner = KeyPair::generate();
        let result = Transaction::mint(
            TransactionKind::CreationReward,
            &miner,
            miner.address(),
            99,
            &config(),
        );
        assert_eq!(
            result,
            Err(ChainError::InvalidRewardValue {
                expected: 100,
                actual: 99
            })
        );

        let ok = Transaction::mint(
            TransactionKind::CreationReward,
            &miner,
            miner.address(),
            100,
            &config(),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_reward_with_sender_rejected() {
        let miner = KeyPair::generate();
        let data = TransactionData::new(
            TransactionKind::CreationReward,
            Some(miner.address()),
            miner.address(),
            miner.public_key_hex(),
            100,
            0,
        );
        assert!(matches!(
            Transaction::create(data, &miner, &config()),
            Err(ChainError::UnexpectedSender(_))
        ));
    }

    #[test]
    fn test_mint_with_fee_rejected() {
        let miner = KeyPair::generate();
        let data = TransactionData::new(
            TransactionKind::Fee,
            None,
            miner.address(),
            miner.public_key_hex(),
            7,
            1,
        );
        assert!(matches!(
            Transaction::create(data, &miner, &config()),
            Err(ChainError::InvalidFeeOnMint(_))
        ));
    }

    #[test]
    fn test_reward_constant_follows_config() {
        let miner = KeyPair::generate();
        let config = ChainConfig {
            creation_reward: 50,
            ..ChainConfig::default()
        };
        let tx = Transaction::mint(
            TransactionKind::CreationReward,
            &miner,
            miner.address(),
            50,
            &config,
        )
        .unwrap();

        assert!(matches!(
            tx.verify(&ChainConfig::default()),
            Err(ChainError::InvalidRewardValue { .. })
        ));
    }

    #[test]
    fn test_non_canonical_datastring_rejected() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::transfer(&alice, bob.address(), 10, 2, None, &config()).unwrap();

        let mut bytes = STANDARD.decode(tx.datastring()).unwrap();
        bytes.extend_from_slice(&[0, 0, 0]);
        let padded = STANDARD.encode(bytes);

        // Under the original signature the padding is caught as tampering.
        assert_eq!(
            Transaction::validate(&padded, tx.signature(), &config()),
            Err(ChainError::SignatureInvalid)
        );

        // Signed by the owner, the padded text still decodes but is not canonical.
        let signature = alice.sign(padded.as_bytes());
        assert_eq!(
            Transaction::validate(&padded, &signature, &config()),
            Err(ChainError::DatastringMismatch)
        );
        assert_eq!(
            Transaction::reconstruct(&padded, &signature, &config()),
            Err(ChainError::DatastringMismatch)
        );
    }

    #[test]
    fn test_malformed_datastring() {
        let result = Transaction::reconstruct("not base64 at all!", "sig", &config());
        assert!(matches!(result, Err(ChainError::MalformedDatastring(_))));

        let truncated = STANDARD.encode([1u8, 0, 0]);
        let result = Transaction::validate(&truncated, "sig", &config());
        assert!(matches!(result, Err(ChainError::MalformedDatastring(_))));
    }

    #[test]
    fn test_invalid_address_inside_datastring() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::transfer(&alice, bob.address(), 10, 2, None, &config()).unwrap();

        let bytes = STANDARD.decode(tx.datastring()).unwrap();
        let recipient = bob.address().to_string();
        let start = bytes
            .windows(recipient.len())
            .position(|w| w == recipient.as_bytes())
            .unwrap();
        let mut tampered = bytes.clone();
        // Break the "0x" prefix of the recipient.
        tampered[start] = b'1';
        let result = Transaction::validate(&STANDARD.encode(tampered), tx.signature(), &config());
        assert!(matches!(result, Err(ChainError::MalformedDatastring(_))));
    }

    #[test]
    fn test_signed_form_round_trip() {
        let alice = KeyPair::generate();
        let bob: Address = KeyPair::generate().address();
        let tx = Transaction::transfer(&alice, bob, 3, 1, Some("memo".into()), &config()).unwrap();

        let signed = tx.to_signed();
        let json = serde_json::to_string(&signed).unwrap();
        let back: SignedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(Transaction::from_signed(&back, &config()).unwrap(), tx);
    }
}
