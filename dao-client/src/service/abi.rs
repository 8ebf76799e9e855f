//! ABI shapes for proposal payloads and the contract functions read live.

use alloy_sol_types::sol;

sol! {
    struct AddMemberParams {
        address owner;
        uint256 threshold;
    }

    struct DeleteMemberParams {
        address prevOwner;
        address owner;
        uint256 threshold;
    }

    struct ReplaceMemberParams {
        address prevOwner;
        address oldOwner;
        address newOwner;
    }

    struct ChangeThresholdParams {
        uint256 threshold;
    }

    struct TokenTransferParams {
        uint256 unused;
        address token;
        address receiver;
        uint256 amount;
    }

    struct TokenAssociationParams {
        uint256 unused;
        address token;
    }

    struct SetTextParams {
        address account;
        string title;
    }

    struct UpgradeProxyParams {
        address proxy;
        address logic;
        address proxyAdmin;
    }

    struct CreateTokenParams {
        string name;
        string symbol;
        uint256 initialSupply;
        address treasury;
    }

    struct GovernanceTokenTransfer {
        uint256 operationType;
        address account;
        address token;
        uint256 amount;
    }

    struct GovernanceTokenAssociation {
        uint256 operationType;
        address token;
    }

    struct GovernanceHbarTransfer {
        uint256 operationType;
        address account;
        uint256 amount;
    }
}

sol! {
    interface IGovernor {
        function state(uint256 proposalId) external view returns (uint8);
        function proposalVotes(uint256 proposalId)
            external
            view
            returns (uint256 againstVotes, uint256 forVotes, uint256 abstainVotes);
        function quorum(uint256 blockNumber) external view returns (uint256);
    }

    interface IMultiSigDao {
        function state(bytes32 txnHash) external view returns (uint8);
    }

    interface IDao {
        function admin() external view returns (address);
    }

    interface IVotingToken {
        function totalSupply() external view returns (uint256);
    }
}
