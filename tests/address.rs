mod common;

use common::ScriptedRng;
use meshlink::{MacAddress, PhyAddress};
use postcard::experimental::max_size::MaxSize;

#[test]
fn random_addresses_skip_broadcast() {
    let mut rng = ScriptedRng::new(&[1, 255, 128]);

    assert_eq!(MacAddress::random(&mut rng), MacAddress::new(1));
    assert_eq!(MacAddress::random(&mut rng), MacAddress::new(255));
    assert_eq!(PhyAddress::random(&mut rng), PhyAddress::new(128));
}

#[test]
fn random_draw_maps_full_range() {
    struct Counter(u32);

    impl rand_core::RngCore for Counter {
        fn next_u32(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
        fn next_u64(&mut self) -> u64 {
            self.next_u32() as u64
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            rand_core::impls::fill_bytes_via_next(self, dest)
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    let mut rng = Counter(u32::MAX - 300);
    let mut seen = [false; 256];
    for _ in 0..600 {
        let address = MacAddress::random(&mut rng);
        assert!(!address.is_broadcast());
        seen[address.into_bits() as usize] = true;
    }
    assert!(seen[1..].iter().all(|hit| *hit));
}

#[test]
fn broadcast_constants() {
    assert!(MacAddress::BROADCAST.is_broadcast());
    assert!(PhyAddress::BROADCAST.is_broadcast());
    assert_eq!(u8::from(MacAddress::BROADCAST), 0);
    assert_eq!(PhyAddress::from(MacAddress::new(33)), PhyAddress::new(33));
}

#[test]
fn addresses_serialize_as_single_byte() {
    assert_eq!(MacAddress::POSTCARD_MAX_SIZE, 1);
    assert_eq!(PhyAddress::POSTCARD_MAX_SIZE, 1);

    let mut buf = [0u8; 4];
    let bytes = postcard::to_slice(&MacAddress::new(200), &mut buf).unwrap();
    assert_eq!(bytes, &[200]);

    let decoded: PhyAddress = postcard::from_bytes(&[17]).unwrap();
    assert_eq!(decoded, PhyAddress::new(17));
}
