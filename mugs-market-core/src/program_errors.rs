//! Custom error codes raised by the marketplace program.

/// First custom error code assigned by the program.
pub const PROGRAM_ERROR_BASE: u32 = 6000;

/// One entry of the program's error table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramErrorEntry {
    pub code: u32,
    pub name: &'static str,
    pub message: &'static str,
}

const fn entry(offset: u32, name: &'static str, message: &'static str) -> ProgramErrorEntry {
    ProgramErrorEntry {
        code: PROGRAM_ERROR_BASE + offset,
        name,
        message,
    }
}

/// Program errors in code order.
pub const PROGRAM_ERRORS: [ProgramErrorEntry; 39] = [
    entry(0, "InvalidSuperOwner", "Invalid Super Owner"),
    entry(1, "InvalidOwner", "Invalid Owner"),
    entry(2, "InvalidGlobalPool", "Invalid Global Pool Address"),
    entry(3, "InvalidFeePercent", "Marketplace Fee is Permyriad"),
    entry(4, "MaxTeamCountExceed", "Max Team Count is 8"),
    entry(5, "NoTeamTreasuryYet", "Treasury Wallet Not Configured"),
    entry(6, "TreasuryAddressNotFound", "Treasury Address Not Exist"),
    entry(7, "TreasuryAddressAlreadyAdded", "Treasury Address Already Exist"),
    entry(8, "MaxTreasuryRateSumExceed", "Total Treasury Rate Sum Should Less Than 100%"),
    entry(9, "TeamTreasuryCountMismatch", "Team Treasury Wallet Count Mismatch"),
    entry(10, "TeamTreasuryAddressMismatch", "Team Treasury Wallet Address Mismatch"),
    entry(11, "Uninitialized", "Uninitialized Account"),
    entry(12, "InvalidParamInput", "Instruction Parameter is Invalid"),
    entry(13, "SellerMismatch", "Payer Mismatch with NFT Seller"),
    entry(14, "InvalidNFTDataAcount", "Invalid NFT Data Account"),
    entry(15, "NotListedNFT", "The NFT Is Not Listed"),
    entry(16, "SellerAccountMismatch", "Seller Account Mismatch with NFT Seller Data"),
    entry(17, "InsufficientBuyerSolBalance", "Buyer Sol Balance is Less than NFT SOL Price"),
    entry(18, "InsufficientBuyerTokenBalance", "Buyer Token Balance is Less than NFT Token Price"),
    entry(19, "InvaliedMetadata", "Invalid Metadata Address"),
    entry(20, "MetadataCreatorParseError", "Can't Parse The NFT's Creators"),
    entry(21, "InvalidOfferDataMint", "Offer Data Mint mismatch with NFT Pubkey"),
    entry(22, "InvalidOfferDataBuyer", "Offer Data Buyer mismatch with Payer Pubkey"),
    entry(23, "OfferForNotListedNFT", "Making Offer for Not Listed NFT"),
    entry(24, "InvalidOfferPrice", "Offer Price Over Thank Listed Price"),
    entry(25, "DisabledOffer", "Already Canceled Offer"),
    entry(26, "OfferForExpiredListingNFT", "Offer For Sold Or Canceled NFT Listing"),
    entry(27, "EndedAuction", "Placing Bid For Ended Auction"),
    entry(28, "InvalidBidPrice", "Placing Bid With Lower Than Highest Bid"),
    entry(29, "DoubleBidFromOneBidder", "Placing Bid Double From One Bidder"),
    entry(30, "OutBidderMismatch", "Out Bidder Account Mismatch With LastBidder Data"),
    entry(31, "NotEndedAuction", "Claiming Auction For Not Ended Auction"),
    entry(32, "CreatorAccountMismatch", "Creator Account Mismatch with Auction Data"),
    entry(33, "BidderAccountMismatch", "Bidder Account Mismatch with Auction Data"),
    entry(34, "AuctionHasBid", "Canceling Auction which has Bid"),
    entry(35, "BidFromAuctionCreator", "Placing Bid From Auction Creator"),
    entry(36, "ListingNotAvailable", "Only Listing and Reserved Auction are possible to exist together"),
    entry(37, "NFTIsNotInUserATA", "NFT Is Not In User ATA"),
    entry(38, "NFTIsNotInEscrowATA", "NFT Is Not In Escrow ATA"),
];

/// Look up a program error by its full custom code (6000 and up).
pub fn describe_program_error(code: u32) -> Option<&'static ProgramErrorEntry> {
    let index = code.checked_sub(PROGRAM_ERROR_BASE)? as usize;
    PROGRAM_ERRORS.get(index)
}

/// Extract the custom error code from a ledger log line such as
/// `Program log: AnchorError ... Error Number: 6015.` or
/// `custom program error: 0x177f`.
pub fn parse_custom_error_code(message: &str) -> Option<u32> {
    if let Some(pos) = message.find("custom program error: 0x") {
        let hex: String = message[pos + "custom program error: 0x".len()..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        return u32::from_str_radix(&hex, 16).ok();
    }
    if let Some(pos) = message.find("Error Number: ") {
        let digits: String = message[pos + "Error Number: ".len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        return digits.parse().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_contiguous() {
        for (i, e) in PROGRAM_ERRORS.iter().enumerate() {
            assert_eq!(e.code, PROGRAM_ERROR_BASE + i as u32);
        }
    }

    #[test]
    fn parses_hex_and_decimal_codes() {
        assert_eq!(parse_custom_error_code("custom program error: 0x177f"), Some(6015));
        assert_eq!(parse_custom_error_code("Error Number: 6028. Error Message"), Some(6028));
        assert_eq!(parse_custom_error_code("blockhash not found"), None);
        assert_eq!(describe_program_error(6015).map(|e| e.name), Some("NotListedNFT"));
        assert!(describe_program_error(5999).is_none());
    }
}
