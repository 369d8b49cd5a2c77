use sealshare_crypto::{content_hash, FileCipher, OsCryptoProvider};
use std::sync::Arc;

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt_file(bencher: divan::Bencher, size: usize) {
    let cipher = FileCipher::new(Arc::new(OsCryptoProvider));
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| cipher.encrypt(divan::black_box(&data)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt_file(bencher: divan::Bencher, size: usize) {
    let cipher = FileCipher::new(Arc::new(OsCryptoProvider));
    let data = make_data(size);
    let (blob, key) = cipher.encrypt(&data).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            cipher
                .decrypt(divan::black_box(blob.as_bytes()), divan::black_box(&key))
                .unwrap()
        });
}

#[divan::bench(args = [1024, 1048576])]
fn bench_content_hash(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| content_hash(divan::black_box(&data)));
}

fn main() {
    divan::main();
}
