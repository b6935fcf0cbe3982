//! NeoScrypt(128, 2, 1) header hash.
//!
//! FastKDF over keyed BLAKE2s feeds two sequential memory-hard mixes (ChaCha20
//! and Salsa20/20 over four 64-byte blocks), whose XOR is compressed by a final
//! FastKDF pass into 32 bytes.

use blake2s_simd::Params as Blake2sParams;
use cropd_consensus::Hash256;

const KDF_BUF: usize = 256;
const KDF_ROUNDS: usize = 32;
const PRF_INPUT: usize = 64;
const PRF_KEY: usize = 32;
const PRF_OUTPUT: usize = 32;

const BLOCK_WORDS: usize = 16;
const STATE_WORDS: usize = 4 * BLOCK_WORDS;
const ITERATIONS: usize = 128;
const DOUBLE_ROUNDS: usize = 10;

#[derive(Clone, Copy)]
enum Mixer {
    Salsa,
    ChaCha,
}

pub fn neoscrypt(input: &[u8]) -> Hash256 {
    let mut expanded = [0u8; KDF_BUF];
    fastkdf(input, input, &mut expanded);

    let mut x = bytes_to_words(&expanded);
    let mut z = x;
    smix(&mut z, Mixer::ChaCha);
    smix(&mut x, Mixer::Salsa);
    for (word, other) in x.iter_mut().zip(z.iter()) {
        *word ^= other;
    }

    let salt = words_to_bytes(&x);
    let mut out = [0u8; 32];
    fastkdf(input, &salt, &mut out);
    out
}

fn fastkdf(password: &[u8], salt: &[u8], output: &mut [u8]) {
    let mut a = [0u8; KDF_BUF + PRF_INPUT];
    let mut b = [0u8; KDF_BUF + PRF_KEY];
    fill_repeating(&mut a[..KDF_BUF], password);
    fill_repeating(&mut a[KDF_BUF..], password);
    fill_repeating(&mut b[..KDF_BUF], salt);
    fill_repeating(&mut b[KDF_BUF..], salt);

    let mut bufptr = 0usize;
    for _ in 0..KDF_ROUNDS {
        let digest = Blake2sParams::new()
            .hash_length(PRF_OUTPUT)
            .key(&b[bufptr..bufptr + PRF_KEY])
            .hash(&a[bufptr..bufptr + PRF_INPUT]);
        let digest = digest.as_bytes();

        bufptr = digest.iter().map(|byte| *byte as usize).sum::<usize>() & (KDF_BUF - 1);
        for (dst, src) in b[bufptr..bufptr + PRF_OUTPUT].iter_mut().zip(digest) {
            *dst ^= src;
        }

        let (head, tail) = b.split_at_mut(KDF_BUF);
        if bufptr < PRF_KEY {
            tail[bufptr..PRF_KEY].copy_from_slice(&head[bufptr..PRF_KEY]);
        }
        if KDF_BUF - bufptr < PRF_OUTPUT {
            let wrapped = PRF_OUTPUT - (KDF_BUF - bufptr);
            head[..wrapped].copy_from_slice(&tail[..wrapped]);
        }
    }

    let until_end = KDF_BUF - bufptr;
    for (i, out) in output.iter_mut().enumerate() {
        let salt_byte = if i < until_end {
            b[bufptr + i]
        } else {
            b[i - until_end]
        };
        *out = salt_byte ^ a[i];
    }
}

fn fill_repeating(buf: &mut [u8], data: &[u8]) {
    for (dst, src) in buf.iter_mut().zip(data.iter().cycle()) {
        *dst = *src;
    }
}

fn smix(state: &mut [u32; STATE_WORDS], mixer: Mixer) {
    let mut scratch = vec![[0u32; STATE_WORDS]; ITERATIONS];
    for slot in scratch.iter_mut() {
        *slot = *state;
        block_mix(state, mixer);
    }
    for _ in 0..ITERATIONS {
        let j = (state[3 * BLOCK_WORDS] as usize) & (ITERATIONS - 1);
        for (word, other) in state.iter_mut().zip(scratch[j].iter()) {
            *word ^= other;
        }
        block_mix(state, mixer);
    }
}

/// B0 = f(B0 ^ B3), B1 = f(B1 ^ B0), B2 = f(B2 ^ B1), B3 = f(B3 ^ B2); output order B0 B2 B1 B3.
fn block_mix(state: &mut [u32; STATE_WORDS], mixer: Mixer) {
    for (dst, src) in [(0, 3), (1, 0), (2, 1), (3, 2)] {
        let mut block = [0u32; BLOCK_WORDS];
        for (k, word) in block.iter_mut().enumerate() {
            *word = state[dst * BLOCK_WORDS + k] ^ state[src * BLOCK_WORDS + k];
        }
        match mixer {
            Mixer::Salsa => salsa20(&mut block),
            Mixer::ChaCha => chacha20(&mut block),
        }
        state[dst * BLOCK_WORDS..(dst + 1) * BLOCK_WORDS].copy_from_slice(&block);
    }
    for k in 0..BLOCK_WORDS {
        state.swap(BLOCK_WORDS + k, 2 * BLOCK_WORDS + k);
    }
}

fn salsa20(block: &mut [u32; BLOCK_WORDS]) {
    fn quarter(x: &mut [u32; BLOCK_WORDS], a: usize, b: usize, c: usize, d: usize) {
        x[b] ^= x[a].wrapping_add(x[d]).rotate_left(7);
        x[c] ^= x[b].wrapping_add(x[a]).rotate_left(9);
        x[d] ^= x[c].wrapping_add(x[b]).rotate_left(13);
        x[a] ^= x[d].wrapping_add(x[c]).rotate_left(18);
    }

    let mut x = *block;
    for _ in 0..DOUBLE_ROUNDS {
        quarter(&mut x, 0, 4, 8, 12);
        quarter(&mut x, 5, 9, 13, 1);
        quarter(&mut x, 10, 14, 2, 6);
        quarter(&mut x, 15, 3, 7, 11);
        quarter(&mut x, 0, 1, 2, 3);
        quarter(&mut x, 5, 6, 7, 4);
        quarter(&mut x, 10, 11, 8, 9);
        quarter(&mut x, 15, 12, 13, 14);
    }
    for (word, mixed) in block.iter_mut().zip(x.iter()) {
        *word = word.wrapping_add(*mixed);
    }
}

fn chacha20(block: &mut [u32; BLOCK_WORDS]) {
    fn quarter(x: &mut [u32; BLOCK_WORDS], a: usize, b: usize, c: usize, d: usize) {
        x[a] = x[a].wrapping_add(x[b]);
        x[d] = (x[d] ^ x[a]).rotate_left(16);
        x[c] = x[c].wrapping_add(x[d]);
        x[b] = (x[b] ^ x[c]).rotate_left(12);
        x[a] = x[a].wrapping_add(x[b]);
        x[d] = (x[d] ^ x[a]).rotate_left(8);
        x[c] = x[c].wrapping_add(x[d]);
        x[b] = (x[b] ^ x[c]).rotate_left(7);
    }

    let mut x = *block;
    for _ in 0..DOUBLE_ROUNDS {
        quarter(&mut x, 0, 4, 8, 12);
        quarter(&mut x, 1, 5, 9, 13);
        quarter(&mut x, 2, 6, 10, 14);
        quarter(&mut x, 3, 7, 11, 15);
        quarter(&mut x, 0, 5, 10, 15);
        quarter(&mut x, 1, 6, 11, 12);
        quarter(&mut x, 2, 7, 8, 13);
        quarter(&mut x, 3, 4, 9, 14);
    }
    for (word, mixed) in block.iter_mut().zip(x.iter()) {
        *word = word.wrapping_add(*mixed);
    }
}

fn bytes_to_words(bytes: &[u8; KDF_BUF]) -> [u32; STATE_WORDS] {
    let mut words = [0u32; STATE_WORDS];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

fn words_to_bytes(words: &[u32; STATE_WORDS]) -> [u8; KDF_BUF] {
    let mut bytes = [0u8; KDF_BUF];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    #[test]
    fn zero_header_known_answer() {
        assert_eq!(
            hex(&neoscrypt(&[0u8; 80])),
            "2c400aba7b67aae2eb8afe32a31303b43a5b2ad884badd97c7984e6b7e3b2c7b"
        );
    }

    #[test]
    fn counting_header_known_answer() {
        let input: Vec<u8> = (0u8..80).collect();
        assert_eq!(
            hex(&neoscrypt(&input)),
            "7258961afb33fd12d00cacb8d63f4f4f52bb6917043865dd24a08f578853122d"
        );
    }

    #[test]
    fn fastkdf_known_answer() {
        let password = b"password".repeat(10);
        let salt = b"salt".repeat(20);
        let mut out = [0u8; 32];
        fastkdf(&password, &salt, &mut out);
        assert_eq!(
            hex(&out),
            "c66d27cb823918b82efdfcffee7a7bc4b303b0779dd29fcb51284d4ea1622dfa"
        );
    }
}
