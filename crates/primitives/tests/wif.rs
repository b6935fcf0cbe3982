use cropd_consensus::{chain_params, Network};
use cropd_primitives::{secret_key_to_wif, wif_to_secret_key, AddressError};

#[test]
fn wif_roundtrips_mainnet() {
    let params = chain_params(Network::Mainnet);
    let secret = [0x11u8; 32];

    let wif_uncompressed = secret_key_to_wif(&secret, &params, false);
    let (decoded, compressed) =
        wif_to_secret_key(&wif_uncompressed, &params).expect("decode mainnet wif");
    assert_eq!(decoded, secret);
    assert!(!compressed);

    let wif_compressed = secret_key_to_wif(&secret, &params, true);
    let (decoded, compressed) =
        wif_to_secret_key(&wif_compressed, &params).expect("decode mainnet wif");
    assert_eq!(decoded, secret);
    assert!(compressed);
}

#[test]
fn wif_roundtrips_testnet() {
    let params = chain_params(Network::Testnet);
    let secret = [0x22u8; 32];
    let wif = secret_key_to_wif(&secret, &params, true);
    let (decoded, compressed) = wif_to_secret_key(&wif, &params).expect("decode");
    assert_eq!(decoded, secret);
    assert!(compressed);
}

#[test]
fn wif_rejects_wrong_network() {
    let secret = [0x33u8; 32];
    let wif = secret_key_to_wif(&secret, &chain_params(Network::Mainnet), false);
    let err = wif_to_secret_key(&wif, &chain_params(Network::Testnet)).unwrap_err();
    assert_eq!(err, AddressError::UnknownPrefix);
}
