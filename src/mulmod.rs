// Modular arithmetic on 576-bit integers for the RANLUX++ generator.
//
// Values are nine 64-bit limbs, least significant limb first. All arithmetic is
// modulo m = 2^576 - 2^240 + 1. Carries are tracked with explicit overflow flags
// so that results are bit-identical on every target, with or without native
// 128-bit multiplication.

/// Number of 64-bit limbs in a 576-bit value.
pub const LIMBS: usize = 9;

/// A 576-bit unsigned integer, least significant limb first.
pub type Uint576 = [u64; LIMBS];

/// A full 1152-bit product of two [`Uint576`] values.
pub type Uint1152 = [u64; 2 * LIMBS];

/// The multiplicative identity.
pub const ONE: Uint576 = [1, 0, 0, 0, 0, 0, 0, 0, 0];

/// The modulus m = 2^576 - 2^240 + 1.
pub const MODULUS: Uint576 = [
    1,
    0,
    0,
    0xffff_0000_0000_0000,
    u64::MAX,
    u64::MAX,
    u64::MAX,
    u64::MAX,
    u64::MAX,
];

/// Compute `a + b` and report whether it wrapped.
#[inline(always)]
fn add_overflow(a: u64, b: u64) -> (u64, u64) {
    let sum = a.wrapping_add(b);
    (sum, (sum < a) as u64)
}

/// Compute `a + b`, adding the wrap flag into `carry`.
#[inline(always)]
fn add_carry(a: u64, b: u64, carry: &mut u64) -> u64 {
    let (sum, overflow) = add_overflow(a, b);
    *carry += overflow;
    sum
}

/// Compute `a - b` and report whether it wrapped.
#[inline(always)]
fn sub_overflow(a: u64, b: u64) -> (u64, u64) {
    let diff = a.wrapping_sub(b);
    (diff, (diff > a) as u64)
}

/// Compute `a - b`, adding the wrap flag into `carry`.
#[inline(always)]
fn sub_carry(a: u64, b: u64, carry: &mut u64) -> u64 {
    let (diff, overflow) = sub_overflow(a, b);
    *carry += overflow;
    diff
}

/// 64x64 -> 128 bit product as `(upper, lower)` using native 128-bit integers.
#[inline(always)]
pub fn mul_wide_native(a: u64, b: u64) -> (u64, u64) {
    let prod = (a as u128) * (b as u128);
    ((prod >> 64) as u64, prod as u64)
}

/// 64x64 -> 128 bit product as `(upper, lower)` built from four 32x32 -> 64 bit
/// products. Produces exactly the same limbs as [`mul_wide_native`].
#[inline(always)]
pub fn mul_wide_portable(a: u64, b: u64) -> (u64, u64) {
    let upper1 = a >> 32;
    let lower1 = a & 0xffff_ffff;
    let upper2 = b >> 32;
    let lower2 = b & 0xffff_ffff;

    // Each partial product is at most (2^32 - 1)^2 = 2^64 - 2^33 + 1.
    let mut upper = upper1 * upper2;
    let middle1 = upper1 * lower2;
    let middle2 = lower1 * upper2;
    let lower = lower1 * lower2;

    // The middle sum can exceed 64 bits; its overflow is worth 2^96 overall,
    // i.e. 2^32 in the upper word. Upper cannot wrap when adding it.
    let (middle, overflow) = add_overflow(middle1, middle2);
    upper += overflow << 32;

    let (lower, overflow) = add_overflow(lower, middle << 32);
    upper += overflow;
    upper += middle >> 32;

    (upper, lower)
}

#[inline(always)]
fn mul_wide(a: u64, b: u64) -> (u64, u64) {
    #[cfg(feature = "portable-mul")]
    {
        mul_wide_portable(a, b)
    }
    #[cfg(not(feature = "portable-mul"))]
    {
        mul_wide_native(a, b)
    }
}

/// Schoolbook product of two 576-bit numbers into 1152 bits, without loss.
pub fn multiply(in1: &Uint576, in2: &Uint576) -> Uint1152 {
    multiply_with(in1, in2, mul_wide)
}

/// Schoolbook product using the given limb multiplier.
pub fn multiply_with(
    in1: &Uint576,
    in2: &Uint576,
    limb_product: impl Fn(u64, u64) -> (u64, u64),
) -> Uint1152 {
    let mut out = [0u64; 2 * LIMBS];
    let mut next = 0u64;
    let mut next_carry = 0u64;

    for (i, out_i) in out.iter_mut().enumerate() {
        let mut current = next;
        let mut carry = next_carry;
        next = 0;
        next_carry = 0;

        let first = i.saturating_sub(LIMBS - 1);
        let last = i.min(LIMBS - 1);
        for j in first..=last {
            let (upper, lower) = limb_product(in1[j], in2[i - j]);
            current = add_carry(current, lower, &mut carry);
            next = add_carry(next, upper, &mut next_carry);
        }

        next = add_carry(next, carry, &mut next_carry);
        *out_i = current;
    }
    out
}

/// Reduce a 1152-bit product to a 576-bit value congruent to it modulo m.
///
/// The result is only guaranteed to be smaller than 2^576, not the least
/// non-negative residue. Use [`canonical`] where a unique representation is
/// required.
pub fn reduce(mul: &Uint1152) -> Uint576 {
    let mut r = [0u64; LIMBS];

    // r = t0 - t1, where t0 and t1 are the lower and upper 576 bits.
    let mut carry = 0u64;
    for i in 0..LIMBS {
        let (r_i, overflow) = sub_overflow(mul[i], carry);
        carry = overflow;
        r[i] = sub_carry(r_i, mul[i + LIMBS], &mut carry);
    }
    let mut c: i64 = -(carry as i64);

    // r -= t2, the 240 bits above 2^(576+336).
    carry = 0;
    for i in 0..LIMBS {
        let (r_i, overflow) = sub_overflow(r[i], carry);
        carry = overflow;

        let mut t2_bits = 0u64;
        if i < 4 {
            t2_bits += mul[i + 14] >> 16;
            if i < 3 {
                t2_bits += mul[i + 15] << 48;
            }
        }
        r[i] = sub_carry(r_i, t2_bits, &mut carry);
    }
    c -= carry as i64;

    // r += (t3 + t2) * 2^240
    carry = 0;
    {
        let t2_bits = (mul[14] >> 16) << 48;
        let t3_bits = mul[9] << 48;
        let mut r_3 = add_carry(r[3], t2_bits, &mut carry);
        r_3 = add_carry(r_3, t3_bits, &mut carry);
        r[3] = r_3;
    }
    for i in 0..3 {
        let (r_i, overflow) = add_overflow(r[i + 4], carry);
        carry = overflow;

        let t2_bits = (mul[14 + i] >> 32) + (mul[15 + i] << 32);
        let t3_bits = (mul[9 + i] >> 16) + (mul[10 + i] << 48);

        let r_i = add_carry(r_i, t2_bits, &mut carry);
        r[i + 4] = add_carry(r_i, t3_bits, &mut carry);
    }
    {
        let (r_7, overflow) = add_overflow(r[7], carry);
        carry = overflow;

        let t2_bits = mul[17] >> 32;
        let t3_bits = (mul[12] >> 16) + (mul[13] << 48);

        let r_7 = add_carry(r_7, t2_bits, &mut carry);
        r[7] = add_carry(r_7, t3_bits, &mut carry);
    }
    {
        let (r_8, overflow) = add_overflow(r[8], carry);
        carry = overflow;

        let t3_bits = (mul[13] >> 16) + (mul[14] << 48);
        r[8] = add_carry(r_8, t3_bits, &mut carry);
    }
    c += carry as i64;

    // c = floor(r / 2^576) was collected from the carries. Subtract c * m; the
    // 2^576 term cancels, leaving c * (-2^240 + 1). The three bit patterns of
    // that product are derived from c without branching.
    let t0: i64 = c >> 1;
    let t2: i64 = t0.wrapping_sub(c.wrapping_shl(48));
    let t1: i64 = t2 >> 48;

    let mut out = [0u64; LIMBS];
    carry = 0;
    out[0] = sub_carry(r[0], c as u64, &mut carry);
    for i in 1..3 {
        let (r_i, overflow) = sub_overflow(r[i], carry);
        carry = overflow;
        out[i] = sub_carry(r_i, t0 as u64, &mut carry);
    }
    {
        let (r_3, overflow) = sub_overflow(r[3], carry);
        carry = overflow;
        out[3] = sub_carry(r_3, t2 as u64, &mut carry);
    }
    for i in 4..LIMBS {
        let (r_i, overflow) = sub_overflow(r[i], carry);
        carry = overflow;
        out[i] = sub_carry(r_i, t1 as u64, &mut carry);
    }
    out
}

/// `reduce(multiply(a, b))`
#[inline]
pub fn mulmod(a: &Uint576, b: &Uint576) -> Uint576 {
    reduce(&multiply(a, b))
}

/// `base^exponent mod m` by binary exponentiation, least significant bit first.
///
/// An exponent of zero yields [`ONE`].
pub fn powermod(base: &Uint576, exponent: u64) -> Uint576 {
    let mut factor = *base;
    let mut result = ONE;
    let mut n = exponent;
    while n != 0 {
        if n & 1 == 1 {
            result = mulmod(&result, &factor);
        }
        n >>= 1;
        if n == 0 {
            break;
        }
        factor = mulmod(&factor, &factor);
    }
    result
}

/// The least non-negative residue of `x` modulo m.
///
/// Any value below 2^576 is less than 2m, so one conditional subtraction
/// suffices.
pub fn canonical(x: &Uint576) -> Uint576 {
    if !greater_or_equal(x, &MODULUS) {
        return *x;
    }
    let mut out = [0u64; LIMBS];
    let mut borrow = 0u64;
    for i in 0..LIMBS {
        let (d, overflow) = sub_overflow(x[i], borrow);
        borrow = overflow;
        out[i] = sub_carry(d, MODULUS[i], &mut borrow);
    }
    out
}

fn greater_or_equal(a: &Uint576, b: &Uint576) -> bool {
    for i in (0..LIMBS).rev() {
        if a[i] != b[i] {
            return a[i] > b[i];
        }
    }
    true
}
