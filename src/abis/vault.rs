use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IVault {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function pricePerShare() external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }
}
