use std::time::Duration;

pub fn mean_duration(values: &[Duration]) -> Duration {
    if values.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = values.iter().sum();
    total / values.len() as u32
}

#[cfg(test)]
mod tests {
    use super::mean_duration;
    use std::time::Duration;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean_duration(&[]), Duration::ZERO);
    }

    #[test]
    fn mean_divides_total_by_count() {
        let values = [
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(60),
        ];
        assert_eq!(mean_duration(&values), Duration::from_millis(30));
    }
}
