use super::*;

#[test]
fn value_balance_add_and_sub() {
    let one = Amount::<NonNegative>::try_from(1).unwrap();
    let two = Amount::<NonNegative>::try_from(2).unwrap();

    let vb1 = ValueBalance::from_sapling_amount(one);
    let vb2 = ValueBalance::from_sapling_amount(two);

    let sum = (vb1 + vb2).unwrap();
    assert_eq!(sum.sapling_amount(), 3);
    assert_eq!(sum.orchard_amount(), 0);

    let diff = (vb2 - vb1).unwrap();
    assert_eq!(diff.sapling_amount(), 1);
}

#[test]
fn constrained_sub_underflow_is_rejected() {
    let one = Amount::<NonNegative>::try_from(1).unwrap();
    let two = Amount::<NonNegative>::try_from(2).unwrap();

    // 1 - 2 would make the sapling pool negative
    let result = ValueBalance::from_sapling_amount(one) - ValueBalance::from_sapling_amount(two);
    assert!(result.is_err());
}

#[test]
fn remaining_transaction_value() {
    let vb = ValueBalance {
        transparent: Amount::try_from(10).unwrap(),
        sprout: Amount::try_from(2).unwrap(),
        sapling: Amount::try_from(3).unwrap(),
        orchard: Amount::try_from(4).unwrap(),
    };
    assert_eq!(vb.remaining_transaction_value().unwrap(), 1);

    let vb = ValueBalance {
        transparent: Amount::try_from(1).unwrap(),
        sprout: Amount::try_from(2).unwrap(),
        sapling: Amount::zero(),
        orchard: Amount::zero(),
    };
    assert!(vb.remaining_transaction_value().is_err());
}
