use sha2::{Digest, Sha512};
use smb2_dtyp::make_guid;
use smb2_negotiate::*;
use smb2_tests::*;

/// A 3.1.1 request captured from a Windows client, offering five dialects
/// and six contexts. Contexts 3, 8, 5 & 7 are compression, signing, netname
/// and RDMA transforms; the last one is not padded.
const CAPTURED_REQUEST: &str = "
    2400050001000000ff000000df0d2ec1dd43f0118b87000c29801682
    7000000006000000 02021002000302031103 0000
    0100260000000000 010020000100
    ed006c304e332890b2bd98617b5ad9ef075994154673696280ffcc0f1291a15d 0000
    02000a0000000000 04000200010004000300 000000000000
    0300120000000000 050000000100000004000200030001000500 000000000000
    0800080000000000 0300020001000000
    0500120000000000 6c006f00630061006c0068006f0073007400 000000000000
    07000c0000000000 020000000000000001000200
";

fn captured_request() -> Vec<u8> {
    hex_to_bytes(CAPTURED_REQUEST)
}

#[test_log::test]
fn test_captured_request_offset() {
    let bytes = captured_request();
    assert_eq!(bytes.len(), 220);
    // 0x70: header, fixed part, five dialects and two bytes of padding.
    assert_eq!(&bytes[28..32], &[0x70, 0, 0, 0]);
}

#[test_log::test]
fn test_captured_request_with_aes256_ciphers() {
    // AES-256 ciphers (0x0003, 0x0004) are not recognized.
    assert!(matches!(
        decode_negotiate_request(&captured_request()),
        Err(SmbMsgError::UnsupportedValue {
            kind: ValueKind::Cipher,
            value: 0x0004
        })
    ));
}

#[test_log::test]
fn test_captured_request_passes_unknown_contexts() {
    // Same capture, offering AES-128 ciphers only.
    let mut bytes = captured_request();
    // Second context: 48 + 48 bytes in, after its header and cipher count.
    let at = 106;
    assert_eq!(&bytes[at..at + 8], &[0x02, 0, 0x01, 0, 0x04, 0, 0x03, 0]);
    bytes[at + 4] = 0x02;
    bytes[at + 6] = 0x01;

    let request = decode_negotiate_request(&bytes).unwrap();
    let ClientNegotiateRequest::Smb3(smb3) = &request else {
        panic!("Expected an SMB 3.x request, got {request:?}");
    };
    assert_eq!(smb3.dialects, Dialect::ALL);
    assert_eq!(
        smb3.client_guid,
        make_guid!("c12e0ddf-43dd-11f0-8b87-000c29801682")
    );
    assert!(smb3.capabilities.notifications() && smb3.capabilities.encryption());

    let types: Vec<u16> = smb3
        .negotiate_context_list
        .iter()
        .map(NegotiateContext::context_type_value)
        .collect();
    assert_eq!(types, vec![1, 2, 3, 8, 5, 7]);

    let preauth = request.get_ctx_preauth_integrity_capabilities().unwrap();
    assert_eq!(preauth.hash_algorithms, vec![HashAlgorithm::Sha512]);
    assert_eq!(preauth.salt.len(), 32);
    assert_eq!(
        request.get_ctx_encryption_capabilities().unwrap().ciphers,
        vec![
            EncryptionCipher::Aes128Gcm,
            EncryptionCipher::Aes128Ccm,
            EncryptionCipher::Aes128Gcm,
            EncryptionCipher::Aes128Ccm
        ]
    );
    assert_eq!(
        smb3.negotiate_context_list[4],
        NegotiateContext::Unknown {
            context_type: 5,
            data: "localhost"
                .encode_utf16()
                .flat_map(|c| c.to_le_bytes())
                .collect(),
        }
    );

    // Re-encoding pads the final context too.
    let mut expected = bytes.clone();
    expected.extend_from_slice(&[0; 4]);
    assert_eq!(encode_negotiate_request(&request).unwrap(), expected);
}

/// Answers `request` the way a server preferring the highest dialect and
/// the client's first cipher does.
fn server_response(request: &ClientNegotiateRequest) -> NegotiateResponse {
    let dialect = request.dialects().iter().max().copied().unwrap_or(Dialect::MIN);
    let response_dialect = if dialect == Dialect::Smb0311 {
        let cipher = request
            .get_ctx_encryption_capabilities()
            .and_then(|e| e.ciphers.first().copied())
            .unwrap_or(EncryptionCipher::NoCommonCipher);
        ResponseDialect::Smb0311(vec![
            PreauthIntegrityCapabilities {
                hash_algorithms: vec![HashAlgorithm::Sha512],
                salt: vec![0x5a; 32],
            }
            .into(),
            EncryptionCapabilities {
                ciphers: vec![cipher],
            }
            .into(),
        ])
    } else {
        ResponseDialect::Legacy(dialect.into())
    };

    NegotiateResponse {
        security_mode: NegotiateSecurityMode::new().with_signing_enabled(true),
        dialect: response_dialect,
        server_guid: Guid::generate(),
        capabilities: GlobalCapabilities::new()
            .with_dfs(true)
            .with_large_mtu(true)
            .with_encryption(dialect.is_smb3() && dialect != Dialect::Smb0311),
        max_transact_size: 8 * 1024 * 1024,
        max_read_size: 8 * 1024 * 1024,
        max_write_size: 8 * 1024 * 1024,
        system_time: FileTime::now(),
        server_start_time: FileTime::default(),
        buffer: hex_to_bytes("602806062b0601050502a01e301ca01a3018060a2b06010401823702021e060a2b06010401823702020a"),
    }
}

#[test_log::test]
fn test_smb311_exchange() {
    let config = NegotiateConfig {
        signing_required: true,
        ..Default::default()
    };

    // Client -> server
    let request = config.build_request().unwrap();
    let request_message = encode_request_message(&Header::negotiate_request(0), &request).unwrap();
    let (_, received) = decode_request_message(&request_message).unwrap();
    assert_eq!(received, request);

    // Server -> client
    let response = server_response(&received);
    let response_message =
        encode_response_message(&Header::negotiate_response(0), &response).unwrap();
    let (header, received_response) = decode_response_message(&response_message).unwrap();
    assert_eq!(header.command, Command::Negotiate);
    assert_eq!(received_response, response);

    let negotiated = NegotiatedProperties::from_exchange(&request, &received_response).unwrap();
    assert_eq!(negotiated.dialect, Dialect::Smb0311);
    assert_eq!(negotiated.cipher, EncryptionCipher::supported_ciphers().first().copied());
    assert_eq!(negotiated.gss_token, response.buffer);

    // Preauth integrity hash over both complete messages.
    let algorithm = negotiated.preauth_hash_algorithm.unwrap();
    let state = PreauthHashState::new(algorithm)
        .next(&request_message)
        .unwrap()
        .next(&response_message)
        .unwrap()
        .finish();

    let h1 = Sha512::new()
        .chain_update([0u8; 64])
        .chain_update(&request_message)
        .finalize();
    let h2 = Sha512::new()
        .chain_update(h1)
        .chain_update(&response_message)
        .finalize();
    assert_eq!(state.final_hash().unwrap(), h2.as_slice());

    // The negotiated cipher can be built and used.
    if let Some(cipher) = negotiated.cipher {
        let implementation = EncryptionCipher::get_cipher(cipher.into()).unwrap();
        let mut algo = implementation
            .build(&[0x11; CipherImplementation::KEY_SIZE])
            .unwrap();
        let nonce = vec![0x22; implementation.nonce_size()];
        let mut payload = request_message.clone();
        let signature = algo.encrypt(&mut payload, b"transform", &nonce).unwrap();
        algo.decrypt(&mut payload, b"transform", &nonce, &signature)
            .unwrap();
        assert_eq!(payload, request_message);
    }
}

#[test_log::test]
fn test_smb302_exchange() {
    let config = NegotiateConfig {
        max_dialect: Dialect::Smb0302,
        ..Default::default()
    };
    let request = config.build_request().unwrap();
    assert!(matches!(request, ClientNegotiateRequest::Smb2(_)));

    let body = encode_negotiate_request(&request).unwrap();
    let received = decode_negotiate_request(&body).unwrap();
    assert_eq!(received, request);

    let response = server_response(&received);
    let received_response =
        decode_negotiate_response(&encode_negotiate_response(&response).unwrap()).unwrap();
    assert!(received_response.negotiate_context_list().is_empty());

    let negotiated = NegotiatedProperties::from_exchange(&request, &received_response).unwrap();
    assert_eq!(negotiated.dialect, Dialect::Smb0302);
    assert_eq!(negotiated.preauth_hash_algorithm, None);
    assert_eq!(negotiated.cipher, Some(EncryptionCipher::Aes128Ccm));
}

#[test_log::test]
fn test_wildcard_response() {
    let request = NegotiateConfig {
        max_dialect: Dialect::Smb021,
        ..Default::default()
    }
    .build_request()
    .unwrap();
    let mut response = server_response(&request);
    response.dialect = ResponseDialect::Legacy(NegotiateDialect::Smb02Wildcard);

    let received_response =
        decode_negotiate_response(&encode_negotiate_response(&response).unwrap()).unwrap();
    assert_eq!(
        received_response.dialect_revision(),
        NegotiateDialect::Smb02Wildcard
    );
    assert!(matches!(
        NegotiatedProperties::from_exchange(&request, &received_response),
        Err(SmbMsgError::NegotiationError(_))
    ));
}
