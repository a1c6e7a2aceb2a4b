//! The deployment plan: every component and call, grouped into stages.
//!
//! Stage order is fixed:
//!
//! ```text
//! oracles -> oracle-aggregator -> interest-engines -> tokens -> manager
//!   -> risk-manager -> asset:<name> (one per asset, in index order) -> call-relay
//! ```
//!
//! Per-asset stages come from one template parameterized by [`AssetConfig`],
//! so adding an asset is a configuration change.

use alloy::primitives::U256;
use deployer_chain::{encode_set_underlying_decimal, HANDLER_RELAY_SIGNATURE};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::config::{AssetConfig, ProtocolParams};
use crate::descriptor::{ArgSpec, ComponentDescriptor, DescriptorRegistry};
use crate::error::DeployError;
use crate::wiring::WiringCall;

/// Fixed component names.
pub mod names {
    pub const INTEREST_MODEL: &str = "InterestModel";
    pub const MANAGER_DATA_STORAGE: &str = "ManagerDataStorage";
    pub const MANAGER: &str = "Manager";
    pub const LIQUIDATION_MANAGER: &str = "LiquidationManager";
}

/// Method signatures of the wiring calls.
pub mod signatures {
    pub const SET_MANAGER_ADDR: &str = "setManagerAddr(address)";
    pub const TRANSFER: &str = "transfer(address,uint256)";
    pub const SET_LIQUIDATION_MANAGER: &str = "setLiquidationManager(address)";
    pub const HANDLER_REGISTER: &str = "handlerRegister(uint256,address)";
    pub const SET_COIN_HANDLER: &str = "setCoinHandler(address,address)";
    pub const SET_TOKEN_HANDLER: &str = "setTokenHandler(address,address)";
    /// index, logic, manager, interest model, data storage, SI engine, SI storage
    pub const INITIALIZE_NATIVE: &str =
        "initialize(uint256,address,address,address,address,address,address)";
    /// As native, with the token address and label after the data storage
    pub const INITIALIZE_TOKEN: &str =
        "initialize(uint256,address,address,address,address,address,string,address,address)";
    pub const SET_LIMIT_OF_ACTION: &str = "setLimitOfAction(uint256)";
    pub const SET_LIQUIDITY_LIMIT: &str = "setLiquidityLimit(uint256)";
}

/// One unit of work.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deploy the named component
    Create(String),
    /// Send a wiring call
    Call(WiringCall),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Create(name) => write!(f, "create {}", name),
            Step::Call(call) => write!(f, "call {}", call.label()),
        }
    }
}

/// Steps that complete together before the next stage starts.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn create(&mut self, name: impl Into<String>) -> &mut Self {
        self.steps.push(Step::Create(name.into()));
        self
    }

    pub fn call(&mut self, call: WiringCall) -> &mut Self {
        self.steps.push(Step::Call(call));
        self
    }
}

/// Components and stages of one deployment.
#[derive(Debug, Clone, Default)]
pub struct DeploymentPlan {
    registry: DescriptorRegistry,
    stages: Vec<Stage>,
}

impl DeploymentPlan {
    /// Assemble a plan from parts. Nothing is checked until [`verify`](Self::verify).
    pub fn from_parts(registry: DescriptorRegistry, stages: Vec<Stage>) -> Self {
        Self { registry, stages }
    }

    /// The full protocol plan. `artifacts` maps component names to the
    /// compiled contract to use when the two differ.
    pub fn build(
        protocol: &ProtocolParams,
        assets: &[AssetConfig],
        artifacts: &BTreeMap<String, String>,
    ) -> Result<Self, DeployError> {
        let mut builder = PlanBuilder {
            registry: DescriptorRegistry::new(),
            stages: Vec::new(),
            artifacts,
        };

        builder.core_stages(protocol, assets)?;
        for asset in assets {
            builder.asset_stage(asset)?;
        }

        let mut relay = Stage::new("call-relay");
        builder.declare(&protocol.call_proxy, vec![ArgSpec::reference(names::MANAGER)])?;
        relay.create(&protocol.call_proxy);
        builder.stages.push(relay);

        Ok(Self {
            registry: builder.registry,
            stages: builder.stages,
        })
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut DescriptorRegistry, &[Stage]) {
        (&mut self.registry, &self.stages)
    }

    pub fn step_count(&self) -> usize {
        self.stages.iter().map(|s| s.steps.len()).sum()
    }

    /// Check the plan without touching the network: every component is
    /// created exactly once, and every reference made by a creation or call
    /// names a component created in an earlier step.
    pub fn verify(&self) -> Result<(), DeployError> {
        let mut created: HashSet<&str> = HashSet::new();

        for stage in &self.stages {
            for step in &stage.steps {
                match step {
                    Step::Create(name) => {
                        let descriptor = self.registry.get(name).ok_or_else(|| {
                            DeployError::UnknownComponent { name: name.clone() }
                        })?;
                        if let Some(missing) = descriptor.references().find(|r| !created.contains(r)) {
                            return Err(DeployError::ReferenceNotReady {
                                requester: name.clone(),
                                reference: missing.to_string(),
                            });
                        }
                        if !created.insert(name.as_str()) {
                            return Err(DeployError::DuplicateComponent { name: name.clone() });
                        }
                    }
                    Step::Call(call) => {
                        call.check()?;
                        if let Some(missing) = call.references().find(|r| !created.contains(r)) {
                            return Err(DeployError::ReferenceNotReady {
                                requester: call.label(),
                                reference: missing.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let never_created: Vec<String> = self
            .registry
            .names()
            .filter(|name| !created.contains(name))
            .map(str::to_string)
            .collect();
        if !never_created.is_empty() {
            return Err(DeployError::IncompleteManifest {
                names: never_created,
            });
        }
        Ok(())
    }
}

struct PlanBuilder<'a> {
    registry: DescriptorRegistry,
    stages: Vec<Stage>,
    artifacts: &'a BTreeMap<String, String>,
}

impl PlanBuilder<'_> {
    fn declare(&mut self, name: &str, args: Vec<ArgSpec>) -> Result<(), DeployError> {
        let mut descriptor = ComponentDescriptor::new(name, args);
        if let Some(artifact) = self.artifacts.get(name) {
            descriptor = descriptor.with_artifact(artifact);
        }
        self.registry.register(descriptor)
    }

    fn core_stages(
        &mut self,
        protocol: &ProtocolParams,
        assets: &[AssetConfig],
    ) -> Result<(), DeployError> {
        let mut oracles = Stage::new("oracles");
        for asset in assets {
            self.declare(&asset.oracle, vec![ArgSpec::uint(asset.oracle_price)])?;
            oracles.create(&asset.oracle);
        }
        self.stages.push(oracles);

        // Aggregator takes the oracles in asset index order
        let mut aggregator = Stage::new("oracle-aggregator");
        let oracle_refs = assets.iter().map(|a| ArgSpec::reference(&a.oracle)).collect();
        self.declare(&protocol.oracle_proxy, oracle_refs)?;
        aggregator.create(&protocol.oracle_proxy);
        self.stages.push(aggregator);

        let mut engines = Stage::new("interest-engines");
        for asset in assets {
            self.declare(&asset.si_engine, vec![])?;
            engines.create(&asset.si_engine);
        }
        self.declare(names::INTEREST_MODEL, vec![])?;
        engines.create(names::INTEREST_MODEL);
        self.stages.push(engines);

        let mut tokens = Stage::new("tokens");
        for asset in assets {
            if let Some(token) = &asset.token {
                self.declare(
                    &token.name,
                    vec![
                        ArgSpec::string(&token.label),
                        ArgSpec::string(&token.symbol),
                        ArgSpec::uint8(asset.decimals),
                    ],
                )?;
                tokens.create(&token.name);
            }
        }
        let reward = &protocol.reward_token;
        self.declare(
            &reward.name,
            vec![
                ArgSpec::string(&reward.label),
                ArgSpec::string(&reward.symbol),
                ArgSpec::uint8(reward.decimals),
            ],
        )?;
        tokens.create(&reward.name);
        self.stages.push(tokens);

        let mut manager = Stage::new("manager");
        self.declare(names::MANAGER_DATA_STORAGE, vec![])?;
        self.declare(
            names::MANAGER,
            vec![
                ArgSpec::string(&protocol.manager_label),
                ArgSpec::reference(names::MANAGER_DATA_STORAGE),
                ArgSpec::reference(&protocol.oracle_proxy),
                ArgSpec::address(protocol.manager_external),
                ArgSpec::reference(&reward.name),
            ],
        )?;
        manager
            .create(names::MANAGER_DATA_STORAGE)
            .create(names::MANAGER)
            .call(WiringCall::new(
                names::MANAGER_DATA_STORAGE,
                signatures::SET_MANAGER_ADDR,
                vec![ArgSpec::reference(names::MANAGER)],
            )?)
            .call(WiringCall::new(
                &reward.name,
                signatures::TRANSFER,
                vec![
                    ArgSpec::reference(names::MANAGER),
                    ArgSpec::uint(protocol.treasury_transfer),
                ],
            )?);
        self.stages.push(manager);

        let mut risk = Stage::new("risk-manager");
        self.declare(
            names::LIQUIDATION_MANAGER,
            vec![ArgSpec::reference(names::MANAGER)],
        )?;
        risk.create(names::LIQUIDATION_MANAGER).call(WiringCall::new(
            names::MANAGER,
            signatures::SET_LIQUIDATION_MANAGER,
            vec![ArgSpec::reference(names::LIQUIDATION_MANAGER)],
        )?);
        self.stages.push(risk);

        Ok(())
    }

    fn asset_stage(&mut self, asset: &AssetConfig) -> Result<(), DeployError> {
        let data_storage = asset.data_storage_name();
        let proxy = asset.proxy_name();
        let si_storage = asset.si_storage_name();
        let logic = asset.logic_name();
        let index = U256::from(asset.index);

        self.declare(
            &data_storage,
            vec![
                ArgSpec::uint(asset.borrow_limit),
                ArgSpec::uint(asset.margin_call_limit),
                ArgSpec::uint(asset.minimum_interest_rate),
                ArgSpec::uint(asset.liquidity_sensitive),
            ],
        )?;
        self.declare(&proxy, vec![])?;
        self.declare(&si_storage, vec![ArgSpec::reference(&proxy)])?;
        self.declare(&logic, vec![])?;

        let mut stage = Stage::new(format!("asset:{}", asset.name));
        stage
            .create(&data_storage)
            .create(&proxy)
            .create(&si_storage)
            .create(&logic)
            .call(WiringCall::new(
                names::MANAGER,
                signatures::HANDLER_REGISTER,
                vec![ArgSpec::uint(index), ArgSpec::reference(&proxy)],
            )?);

        let bind = if asset.is_native() {
            signatures::SET_COIN_HANDLER
        } else {
            signatures::SET_TOKEN_HANDLER
        };
        stage.call(WiringCall::new(
            &data_storage,
            bind,
            vec![
                ArgSpec::reference(&proxy),
                ArgSpec::reference(names::INTEREST_MODEL),
            ],
        )?);

        let mut init = vec![
            ArgSpec::uint(index),
            ArgSpec::reference(&logic),
            ArgSpec::reference(names::MANAGER),
            ArgSpec::reference(names::INTEREST_MODEL),
            ArgSpec::reference(&data_storage),
        ];
        let init_signature = match &asset.token {
            Some(token) => {
                init.push(ArgSpec::reference(&token.name));
                init.push(ArgSpec::string(&token.label));
                signatures::INITIALIZE_TOKEN
            }
            None => signatures::INITIALIZE_NATIVE,
        };
        init.push(ArgSpec::reference(&asset.si_engine));
        init.push(ArgSpec::reference(&si_storage));

        stage
            .call(WiringCall::new(&proxy, init_signature, init)?)
            .call(WiringCall::new(
                &data_storage,
                signatures::SET_LIMIT_OF_ACTION,
                vec![ArgSpec::uint(asset.limit_of_action)],
            )?)
            .call(WiringCall::new(
                &data_storage,
                signatures::SET_LIQUIDITY_LIMIT,
                vec![ArgSpec::uint(asset.liquidity_limit)],
            )?);

        // Native precision is canonical; tokens get theirs through the relay
        if !asset.is_native() {
            let payload = encode_set_underlying_decimal(asset.decimals);
            stage.call(WiringCall::new(
                &proxy,
                HANDLER_RELAY_SIGNATURE,
                vec![ArgSpec::bytes(payload.to_vec())],
            )?);
        }

        self.stages.push(stage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_assets, sample_protocol};

    fn sample_plan() -> DeploymentPlan {
        DeploymentPlan::build(&sample_protocol(), &sample_assets(), &BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_stage_order() {
        let plan = sample_plan();
        let stages: Vec<&str> = plan.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            stages,
            vec![
                "oracles",
                "oracle-aggregator",
                "interest-engines",
                "tokens",
                "manager",
                "risk-manager",
                "asset:Coin",
                "asset:Usdt",
                "asset:Dai",
                "asset:Link",
                "call-relay",
            ]
        );
    }

    #[test]
    fn test_full_plan_verifies() {
        let plan = sample_plan();
        plan.verify().unwrap();
        // 4 oracles, aggregator, 4 engines, interest model, 3 tokens, reward
        // token, manager storage, manager, liquidation manager,
        // 4 x 4 handler components, call relay
        assert_eq!(plan.registry().len(), 4 + 1 + 4 + 1 + 3 + 1 + 2 + 1 + 16 + 1);
    }

    #[test]
    fn test_native_stage_has_no_relay() {
        let plan = sample_plan();
        let coin = plan.stages().iter().find(|s| s.name == "asset:Coin").unwrap();
        let labels: Vec<String> = coin.steps.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "create CoinHandlerDataStorage",
                "create CoinHandlerProxy",
                "create CoinSIDataStorage",
                "create CoinHandlerLogic",
                "call Manager.handlerRegister",
                "call CoinHandlerDataStorage.setCoinHandler",
                "call CoinHandlerProxy.initialize",
                "call CoinHandlerDataStorage.setLimitOfAction",
                "call CoinHandlerDataStorage.setLiquidityLimit",
            ]
        );

        let usdt = plan.stages().iter().find(|s| s.name == "asset:Usdt").unwrap();
        let last = usdt.steps.last().unwrap().to_string();
        assert_eq!(last, "call UsdtHandlerProxy.handlerViewProxy");
    }

    #[test]
    fn test_artifact_overrides() {
        let mut artifacts = BTreeMap::new();
        artifacts.insert("Manager".to_string(), "etherManager".to_string());
        let plan = DeploymentPlan::build(&sample_protocol(), &sample_assets(), &artifacts).unwrap();

        assert_eq!(plan.registry().get("Manager").unwrap().artifact, "etherManager");
        assert_eq!(plan.registry().get("InterestModel").unwrap().artifact, "InterestModel");
    }

    #[test]
    fn test_verify_catches_forward_reference() {
        let mut registry = DescriptorRegistry::new();
        registry
            .register(ComponentDescriptor::new(
                "LiquidationManager",
                vec![ArgSpec::reference("Manager")],
            ))
            .unwrap();
        registry
            .register(ComponentDescriptor::new("Manager", vec![]))
            .unwrap();

        let mut stage = Stage::new("misordered");
        stage.create("LiquidationManager").create("Manager");
        let plan = DeploymentPlan::from_parts(registry, vec![stage]);

        let err = plan.verify().unwrap_err();
        assert!(err.is_plan_defect());
        assert!(matches!(
            err,
            DeployError::ReferenceNotReady { ref reference, .. } if reference == "Manager"
        ));
    }

    #[test]
    fn test_verify_catches_uncreated_component() {
        let mut registry = DescriptorRegistry::new();
        registry
            .register(ComponentDescriptor::new("Manager", vec![]))
            .unwrap();
        let plan = DeploymentPlan::from_parts(registry, vec![]);

        let err = plan.verify().unwrap_err();
        assert!(matches!(err, DeployError::IncompleteManifest { .. }));
    }

    #[test]
    fn test_shipped_deployment_verifies() {
        let config_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config");
        let loader = crate::config::DeploymentLoader::new(config_dir).unwrap();

        for name in ["bifi-dev", "bifi-goerli"] {
            let resolved = loader.load(name).unwrap();
            let plan =
                DeploymentPlan::build(&resolved.protocol, &resolved.assets, &resolved.artifacts)
                    .unwrap();
            plan.verify().unwrap();
            assert_eq!(
                plan.registry().get("CoinSIHandlerDataStorage").unwrap().artifact,
                "marketSIHandlerDataStorage"
            );
            assert!(plan.registry().get("UsdtSIDataStorage").is_some());
        }
    }

    #[test]
    fn test_shipped_risk_parameters() {
        use crate::descriptor::encode_constructor_args;
        use crate::manifest::DeploymentManifest;
        use crate::units::parse_wad;
        use alloy::dyn_abi::DynSolValue;

        let config_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config");
        let loader = crate::config::DeploymentLoader::new(config_dir).unwrap();
        let resolved = loader.load("bifi-dev").unwrap();

        // borrow limit, margin call limit, minimum interest rate, liquidity sensitivity
        let expected = [
            ("Coin", ["0.8", "0.93", "0.02", "0.1"]),
            ("Usdt", ["0.5", "0.93", "0", "0.04"]),
            ("Dai", ["0.75", "0.93", "0", "0.05"]),
            ("Link", ["0.6", "0.90", "0.02", "0.1"]),
        ];
        assert_eq!(resolved.assets.len(), expected.len());

        for (asset, (name, ratios)) in resolved.assets.iter().zip(expected) {
            assert_eq!(asset.name, name);
            let actual = [
                asset.borrow_limit,
                asset.margin_call_limit,
                asset.minimum_interest_rate,
                asset.liquidity_sensitive,
            ];
            let wanted = ratios.map(|r| parse_wad(r).unwrap());
            assert_eq!(actual, wanted, "{} risk parameters", name);
        }

        // The data storage constructor carries the same four values
        let plan =
            DeploymentPlan::build(&resolved.protocol, &resolved.assets, &resolved.artifacts)
                .unwrap();
        let dai = plan.registry().get("DaiHandlerDataStorage").unwrap();
        let args = dai.encoded_args(&DeploymentManifest::new()).unwrap();
        let expected = encode_constructor_args(vec![
            DynSolValue::Uint(parse_wad("0.75").unwrap(), 256),
            DynSolValue::Uint(parse_wad("0.93").unwrap(), 256),
            DynSolValue::Uint(U256::ZERO, 256),
            DynSolValue::Uint(parse_wad("0.05").unwrap(), 256),
        ]);
        assert_eq!(args, expected);
    }

    #[test]
    fn test_duplicate_names_across_assets() {
        let mut assets = sample_assets();
        assets[2].si_engine = assets[1].si_engine.clone();
        let err =
            DeploymentPlan::build(&sample_protocol(), &assets, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, DeployError::DuplicateComponent { .. }));
    }
}
