//! Deterministic Paillier keys and Pedersen parameters for tests of the proofs
//!
//! The prover and the verifier own distinct Paillier key pairs built from fixed 1024 bit primes.
//! The Pedersen parameters live over the modulus of the verifier.
//! Nothing is cached: every call of [`fixtures`] builds fresh values.

use crate::algorithms::encryption::PaillierKeys;
use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::zkp::ZkError;
use curv::BigInt;

const PROVER_P: &str = concat!(
    "FD90167F42443623D284EA828FB13E374CBF73E16CC6755422B97640AB7FC77FDAF452B4F3A2E8472614EEE11CC8EAF4",
    "8783CE2B4876A3BB72E9ACF248E86DAA5CE4D5A88E77352BCBA30A998CD8B0AD2414D43222E3BA56D82523E2073730F8",
    "17695B34A4A26128D5E030A7307D3D04456DC512EBB8B53FDBD1DFC07662099B",
);

const PROVER_Q: &str = concat!(
    "DB531C32024A262A0DF9603E48C79E863F9539A82B8619480289EC38C3664CC63E3AC2C04888827559FFDBCB735A8D2F",
    "1D24BAF910643CE819452D95CAFFB686E6110057985E93605DE89E33B99C34140EF362117F975A5056BFF14A51C9CD16",
    "A4961BE1F02C081C7AD8B2A5450858023A157AFA3C3441E8E00941F8D33ED6B7",
);

const VERIFIER_P: &str = concat!(
    "EEEFE9909452DEC61592452661DA397DB0A0A2BCFD7F6FC07EFDF98DAAE3BA276AA244E3162E95196E87BD73902EDF9F",
    "3823C90E239E683E37973185B30746D06CD901581448F0FEF3EFEDDD5DD21904ED3EEB6C8381ABFF6A3F41CD0B1ADD61",
    "F9E74DCA871404AE2813FFAA1886FEE6F896F647D8F296877F8F728D008C4CB3",
);

const VERIFIER_Q: &str = concat!(
    "F5D4C0FE31CE43EFC25BC3D8AA3E14C8F9D831A932ABEFB9755A7A0556BB9F6CA63C1CB242703FEA151952888C37850E",
    "F5D024BA2D6A0D081196FF1616DE9BB7E7FFD13D857CA9C382896E9B772C2C5358EC99A50505DF52F98BC7EB7215912F",
    "2CECBE723BF261A87F1F13D9964A3B318FD60AAE176D5A37A4855F5C0E6D7F83",
);

const PEDERSEN_S: &str = concat!(
    "254481827565402228663195018986342709775996937360751162517678113983217617343364925751942653157923",
    "558085847183366637826722046881064174783689633004737512145913423374766837027128496518092315506409",
    "756025186199068614866551787320003887912541507850998208542793465483465281124234913164702012337482",
    "378399026695258546026688649741890225993793667456154809404370939196325524023531874556763938532300",
    "653841086832495378941671984894534904940466343586481956773410221498080319539315846690151245596818",
    "994327491310377149753129071149715720567367646059685150555625660210584419657444421631760545574942",
    "86204809259988469497547181346009783327359",
);

const PEDERSEN_T: &str = concat!(
    "801531620108375385616799998775885547359693629864782349405205980638527071621015588516771656350741",
    "716494275768662389945937404596105628802479823308386123371253031163944297527787690095887007255206",
    "461280642941106522607687752501956072921637170742233132904348562958183671369483098875406112160581",
    "337666557554579343548019407103687760426691839780397933552596594955598363305335523601600066190460",
    "082837716663082993648812393566614819301963161274585263295070472606200170564402553942248883247357",
    "671671016621803293152485528074445070391232549286505073966226051859397787648543465010140320961505",
    "1036271024149130698937966662896144492264",
);

pub struct Fixtures {
    pub prover: PaillierKeys,
    pub verifier: PaillierKeys,
    /// Pedersen parameters over the modulus of `verifier`
    pub pedersen: PedersenParameters,
}

fn parse(value: &str, radix: u8) -> Result<BigInt, ZkError> {
    BigInt::from_str_radix(value, radix).map_err(|e| ZkError::Fixture(format!("{:?}", e)))
}

pub fn fixtures() -> Result<Fixtures, ZkError> {
    let prover = PaillierKeys::from_primes(&parse(PROVER_P, 16)?, &parse(PROVER_Q, 16)?);
    let verifier = PaillierKeys::from_primes(&parse(VERIFIER_P, 16)?, &parse(VERIFIER_Q, 16)?);
    let pedersen = PedersenParameters::new(
        verifier.ek.n.clone(),
        parse(PEDERSEN_S, 10)?,
        parse(PEDERSEN_T, 10)?,
    )
    .map_err(|e| ZkError::Fixture(e.to_string()))?;
    Ok(Fixtures {
        prover,
        verifier,
        pedersen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_consistent() -> anyhow::Result<()> {
        let f = fixtures()?;
        assert!(PaillierKeys::is_valid(&f.prover.ek, &f.prover.dk));
        assert!(PaillierKeys::is_valid(&f.verifier.ek, &f.verifier.dk));
        assert_ne!(f.prover.ek.n, f.verifier.ek.n);
        assert_eq!(f.pedersen.n(), &f.verifier.ek.n);
        Ok(())
    }
}
