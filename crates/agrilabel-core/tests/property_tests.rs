//! Property-based tests for the GS1 and weighing invariants.
//!
//! These run the identifier and weight code over generated inputs to catch
//! edge cases the example-based unit tests miss.

use agrilabel_core::gs1::{check_digit, Gtin, Sscc};
use agrilabel_core::types::{Article, LinePallet, ShipmentLine, UnitOfMeasure, WeighingMode};
use agrilabel_core::weighing::{aggregate, compute_line, line_tare};
use agrilabel_core::Weight;
use proptest::prelude::*;

// Strategies for generating test data
fn digits_strategy(min: usize, max: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(0u8..10, min..=max)
        .prop_map(|digits| digits.iter().map(|d| char::from(b'0' + d)).collect())
}

fn tare_strategy() -> impl Strategy<Value = Weight> {
    (0i64..50_000).prop_map(Weight::from_grams)
}

fn line_strategy() -> impl Strategy<Value = ShipmentLine> {
    (
        0u32..500,
        tare_strategy(),
        proptest::collection::vec(tare_strategy(), 0..4),
        0i64..5_000_000,
    )
        .prop_map(|(count, packaging_tare, pallet_tares, gross)| ShipmentLine {
            count,
            packaging_tare,
            pallets: pallet_tares
                .into_iter()
                .enumerate()
                .map(|(i, tare)| LinePallet {
                    instance_id: format!("p-{}", i),
                    pallet_type_id: "PAL01".to_string(),
                    name: "EPAL (80x120)".to_string(),
                    tare,
                })
                .collect(),
            gross_weight: Weight::from_grams(gross),
            ..ShipmentLine::new()
        })
}

fn article(mode: WeighingMode, uom: UnitOfMeasure, unit_weight: Weight) -> Article {
    Article {
        code: "ART".to_string(),
        description: "Generated".to_string(),
        gtin: Gtin::normalize("8012345000012").unwrap(),
        origin: "IT".to_string(),
        unit_of_measure: uom,
        weighing_mode: mode,
        unit_weight,
        default_packaging_id: None,
    }
}

/// "Round the weighted sum up to the next multiple of ten" formulation.
fn round_up_check_digit(body: &str) -> u8 {
    let sum: u32 = body
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 0 {
                digit * 3
            } else {
                digit
            }
        })
        .sum();
    let next_multiple = (sum + 9) / 10 * 10;
    (next_multiple - sum) as u8
}

// Property: check digit is a single digit, stable, and matches the round-up formula
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn check_digit_is_deterministic_and_in_range(body in digits_strategy(1, 40)) {
        let first = check_digit::compute(&body).unwrap();
        let second = check_digit::compute(&body).unwrap();
        prop_assert!(first <= 9);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn check_digit_matches_round_up_formulation(body in digits_strategy(1, 40)) {
        prop_assert_eq!(check_digit::compute(&body).unwrap(), round_up_check_digit(&body));
    }

    #[test]
    fn non_digit_input_is_rejected(body in "[0-9]{0,6}[A-Za-z .-][0-9]{0,6}") {
        prop_assert!(check_digit::compute(&body).is_err(), "accepted {:?}", body);
    }
}

// Property: GTIN-13 round trip and check digit mutation
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn gtin13_normalizes_to_padded_gtin14(body in digits_strategy(12, 12)) {
        let check = check_digit::compute(&body).unwrap();
        let gtin13 = format!("{}{}", body, check);

        let gtin = Gtin::normalize(&gtin13).unwrap();
        prop_assert_eq!(gtin.as_str(), format!("0{}", gtin13));
    }

    #[test]
    fn mutated_check_digit_is_rejected(body in digits_strategy(12, 12), shift in 1u8..10) {
        let check = check_digit::compute(&body).unwrap();
        let wrong = (check + shift) % 10;
        let gtin13 = format!("{}{}", body, wrong);

        prop_assert!(Gtin::normalize(&gtin13).is_err());
    }
}

// Property: SSCC shape
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn sscc_is_eighteen_valid_digits(
        extension in 0u8..10,
        prefix in digits_strategy(1, 9),
        serial in 0u64..10_000_000,
    ) {
        let sscc = Sscc::generate(extension, &prefix, serial).unwrap();
        prop_assert_eq!(sscc.as_str().len(), 18);
        prop_assert!(check_digit::verify(sscc.as_str()).is_ok());
        prop_assert_eq!(&sscc, &Sscc::generate(extension, &prefix, serial).unwrap());
        let expected_start = format!("{}{}", extension, prefix);
        prop_assert!(sscc.as_str().starts_with(&expected_start));
    }
}

// Property: weight conservation and clamping
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn fixed_lines_conserve_weight(line in line_strategy(), unit_grams in 1i64..100_000) {
        for uom in [UnitOfMeasure::Kg, UnitOfMeasure::Pz] {
            let article = article(WeighingMode::Fixed, uom, Weight::from_grams(unit_grams));
            let computed = compute_line(&line, Some(&article));

            prop_assert_eq!(computed.gross_weight - line_tare(&computed), computed.net_weight);
            prop_assert_eq!(computed.net_weight, Weight::from_grams(unit_grams) * line.count);
        }
    }

    #[test]
    fn variable_lines_clamp_net_at_zero(line in line_strategy()) {
        let article = article(WeighingMode::Variable, UnitOfMeasure::Kg, Weight::zero());
        let computed = compute_line(&line, Some(&article));
        let expected = (line.gross_weight - line_tare(&line)).clamp_non_negative();

        prop_assert!(!computed.net_weight.is_negative());
        prop_assert_eq!(computed.net_weight, expected);
        prop_assert_eq!(computed.gross_weight, line.gross_weight);
    }

    #[test]
    fn aggregation_has_no_rounding_drift(lines in proptest::collection::vec(line_strategy(), 1..20)) {
        let computed: Vec<ShipmentLine> = lines.iter().map(|l| compute_line(l, None)).collect();
        let totals = aggregate(&computed);

        let net_grams: i64 = computed.iter().map(|l| l.net_weight.grams()).sum();
        let tare_grams: i64 = computed.iter().map(|l| line_tare(l).grams()).sum();
        prop_assert_eq!(totals.net.grams(), net_grams);
        prop_assert_eq!(totals.tare.grams(), tare_grams);
    }

    #[test]
    fn lenient_parsing_never_fails(input in ".{0,24}") {
        let _ = Weight::parse_lenient(&input);
        let _ = agrilabel_core::validation::parse_count_lenient(&input);
    }
}
