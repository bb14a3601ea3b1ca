use super::*;

use color_eyre::Report;

#[test]
fn halving() -> Result<(), Report> {
    let network = Network::Mainnet;
    let blossom_height = Blossom.activation_height(network).unwrap();
    let canopy_height = Canopy.activation_height(network).unwrap();

    assert_eq!(
        Some(1),
        halving_divisor((blossom_height - 1).unwrap(), network)
    );
    assert_eq!(Some(1), halving_divisor(blossom_height, network));
    assert_eq!(
        Some(1),
        halving_divisor((canopy_height - 1).unwrap(), network)
    );
    assert_eq!(Some(2), halving_divisor(canopy_height, network));
    assert_eq!(Some(2), halving_divisor((canopy_height + 1).unwrap(), network));

    Ok(())
}

#[test]
fn block_subsidy_at_key_heights() -> Result<(), Report> {
    let network = Network::Mainnet;
    let blossom_height = Blossom.activation_height(network).unwrap();
    let canopy_height = Canopy.activation_height(network).unwrap();

    // After slow-start mining and before Blossom the block reward is 12.5 ZEC
    assert_eq!(
        Amount::try_from(1_250_000_000),
        block_subsidy((blossom_height - 1).unwrap(), network)
    );

    // After Blossom the block reward is halved to 6.25 ZEC without a halving
    assert_eq!(
        Amount::try_from(625_000_000),
        block_subsidy(blossom_height, network)
    );

    // After the 1st halving (coinciding with Canopy) the reward is 3.125 ZEC
    assert_eq!(
        Amount::try_from(312_500_000),
        block_subsidy(canopy_height, network)
    );

    Ok(())
}

#[test]
fn funding_stream_values_sum_to_a_fifth() -> Result<(), Report> {
    let network = Network::Mainnet;
    let height = Height(1_100_000);
    let subsidy = block_subsidy(height, network)?;

    let elements = funding_stream_elements(height, network, subsidy)?;
    assert_eq!(elements.len(), 3);

    let total: crate::amount::Result<Amount<NonNegative>> =
        elements.iter().map(|element| element.value).sum();
    // 7% + 5% + 8% = 20% of the block subsidy
    assert_eq!(total.unwrap(), (subsidy / 5).unwrap());

    Ok(())
}

#[test]
fn funding_streams_inactive_outside_range() -> Result<(), Report> {
    let network = Network::Mainnet;

    for height in [Height(1_046_399), Height(2_726_400)] {
        let subsidy = block_subsidy(height, network)?;
        assert!(funding_stream_elements(height, network, subsidy)?.is_empty());
    }

    Ok(())
}

#[test]
fn funding_stream_recipient_index_is_in_table_bounds() {
    for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
        let range = network.funding_stream_height_range();
        // probe the ends and some interior heights; the index assertion in
        // funding_stream_address_index catches any table overrun
        let probes = [
            range.start,
            Height(range.start.0 + (range.end.0 - range.start.0) / 3),
            Height(range.start.0 + 2 * (range.end.0 - range.start.0) / 3),
            Height(range.end.0 - 1),
        ];
        for height in probes {
            for &(receiver, _) in FUNDING_STREAM_RECEIVER_NUMERATORS {
                let _ = funding_stream_recipient(height, network, receiver);
            }
        }
    }
}

#[test]
fn founders_reward_is_a_fifth_until_the_first_halving() -> Result<(), Report> {
    let network = Network::Mainnet;
    let blossom_height = Blossom.activation_height(network).unwrap();
    let canopy_height = Canopy.activation_height(network).unwrap();

    // Before Blossom: 20 * 12.5 / 100 = 2.5 ZEC
    assert_eq!(
        Amount::try_from(250_000_000),
        founders_reward((blossom_height - 1).unwrap(), network)
    );
    // After Blossom: 20 * 6.25 / 100 = 1.25 ZEC
    assert_eq!(
        Amount::try_from(125_000_000),
        founders_reward(blossom_height, network)
    );
    // The founders' reward expires at the first halving
    assert_eq!(Amount::try_from(0), founders_reward(canopy_height, network));

    Ok(())
}

#[test]
fn founders_reward_script_changes_with_height() {
    let network = Network::Mainnet;

    let early = founders_reward_script(Height(20_000), network);
    let late = founders_reward_script(last_founders_reward_height(network), network);

    assert_ne!(early, late);
    // standard P2SH scripts are 23 bytes
    assert_eq!(early.as_raw_bytes().len(), 23);
}

#[test]
fn miner_subsidy_subtracts_non_miner_reward() -> Result<(), Report> {
    let network = Network::Mainnet;
    let blossom_height = Blossom.activation_height(network).unwrap();

    let founders = founders_reward(blossom_height, network)?;
    // 80% of 6.25 ZEC
    assert_eq!(
        Amount::try_from(500_000_000),
        miner_subsidy(blossom_height, network, Some(founders))
    );

    Ok(())
}
