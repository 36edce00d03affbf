use zkstark_field::polynomial::Polynomial;
use zkstark_field::{FieldError, PrimeField};

fn main() -> Result<(), FieldError> {
    let field = PrimeField::new(2013265921u64)?;
    let coeffs: Vec<u64> = (1..=16).collect();
    let poly = Polynomial::from_u64s(&field, &coeffs);
    let values = poly.fft(16)?;
    println!("{:?}", values.values);
    assert_eq!(values.ifft()?, poly);
    Ok(())
}
