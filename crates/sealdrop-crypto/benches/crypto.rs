use sealdrop_crypto::{decrypt, deserialize, encrypt, serialize, KdfParams};
use secrecy::SecretString;

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

// Light Argon2 so the AEAD cost stays visible next to the KDF
fn bench_params() -> KdfParams {
    KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let passphrase = SecretString::from("bench-passphrase");
    let params = bench_params();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            encrypt(
                divan::black_box(&data),
                divan::black_box(&passphrase),
                &params,
            )
            .unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let passphrase = SecretString::from("bench-passphrase");
    let params = bench_params();
    let sealed = encrypt(&make_data(size), &passphrase, &params).unwrap();
    let m = sealed.material;
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt(
                divan::black_box(&sealed.ciphertext),
                &m.nonce,
                &m.auth_tag,
                &m.salt,
                divan::black_box(&passphrase),
                &params,
            )
            .unwrap()
        });
}

#[divan::bench(args = [1024, 1048576])]
fn bench_frame_roundtrip(bencher: divan::Bencher, size: usize) {
    let passphrase = SecretString::from("bench-passphrase");
    let sealed = encrypt(&make_data(size), &passphrase, &bench_params()).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let blob = serialize(
                &sealed.material,
                "report.pdf",
                "application/pdf",
                divan::black_box(&sealed.ciphertext),
            )
            .unwrap();
            deserialize(divan::black_box(&blob)).unwrap()
        });
}

fn main() {
    divan::main();
}
